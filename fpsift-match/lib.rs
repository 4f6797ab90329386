//! Descriptor matching and template similarity scoring.
//!
//! [`TemplateMatcher`] runs a 2-nearest-neighbour search of every descriptor
//! of the first template against the second, filters the candidates with
//! Lowe's ratio test and normalizes the surviving count by the smaller
//! template's feature count.
//!
//! Neighbour search is delegated to OpenCV: a FLANN k-d forest by default,
//! or `BFMatcher` for exact results.

pub mod brute_force;
pub mod config;
pub mod cv;
pub mod error;
pub mod flann;
pub mod matcher;

pub use brute_force::BruteForceMatcher;
pub use config::{MatcherBackend, MatcherConfig};
pub use error::{MatchError, MatchResult};
pub use flann::FlannMatcher;
pub use matcher::{
    ratio_test, ApproximateMatcher, ComparisonResult, ConfiguredMatcher, TemplateMatcher,
};
