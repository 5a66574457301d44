pub mod aabb;
pub mod bvh;
pub mod triangle;

pub use aabb::{Aabb, GridBox};
pub use bvh::TriangleBvh;
pub use triangle::{triangle_intersects_aabb, Triangle};
