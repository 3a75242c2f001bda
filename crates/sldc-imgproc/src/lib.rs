#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// color transformations module.
pub mod color;

/// contour tracing and hierarchy module.
pub mod contours;

/// binary and grayscale morphology module.
pub mod morphology;

/// module containing parallelization utilities.
pub mod parallel;

/// operations to threshold images.
pub mod threshold;
