//! Built-in geometry sources
//!
//! Simple, swappable tessellators; the renderer consumes the resulting
//! [`Geometry`](crate::resources::Geometry) opaquely.

pub mod plane;
pub mod sphere;

pub use plane::{PlaneOptions, create_plane};
pub use sphere::{SphereOptions, create_sphere};
