//! Geometry: buffer rings around a site and separation between geometries
//!
//! Coordinates are `[longitude, latitude]` in degrees throughout, and all distances are
//! in feet.

pub mod buffer;
pub mod distance;

pub use buffer::{circle, generate_rings, BufferRing, DEFAULT_RING_MULTIPLES};
pub use distance::{coord_distance_ft, min_distance_ft, vertices, FEET_PER_DEGREE_LAT};
