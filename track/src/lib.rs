pub mod blueprint;
pub mod generator;
pub mod rng;
pub mod segment;
pub mod track;
pub mod types;
pub mod vec3;

pub use segment::{BASE_WIDTH, MAX_ELEV_DELTA};
pub use track::{Track, LOOK_AHEAD};
pub use types::{Direction, Sample, SegmentFamily, SegmentKind, TrackPoint};
pub use vec3::Vec3;
