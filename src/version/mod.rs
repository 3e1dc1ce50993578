//! Version-gap calculation over messy registry version strings.

mod distance;
mod relaxed;

pub use distance::version_distance;
pub use relaxed::parse_relaxed;
