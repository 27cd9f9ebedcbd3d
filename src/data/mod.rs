//! data — size classes, samples and datasets consumed by the resolvers.
//!
//! Both resolvers treat a [`GrainSizeDataset`] as read-only input. The checks
//! performed here are minimal: finite, non-negative values of
//! the right length on a strictly monotonic class axis.

pub mod classes;
pub mod dataset;
pub mod errors;

pub use self::classes::SizeClasses;
pub use self::dataset::{GrainSizeDataset, Sample};
pub use self::errors::{DataError, DataResult};
