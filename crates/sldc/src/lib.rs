#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the segmentation and location stages.
pub mod error;

/// Binary mask to polygon conversion.
pub mod locator;

/// RGB tile to binary mask segmentation.
pub mod segmenter;

/// Affine re-basing of polygons into a parent image frame.
pub mod transform;

/// Geometric validity checks for located polygons.
pub mod validity;

pub use crate::error::{LocatorError, SegmenterError};
pub use crate::locator::{DropReason, DroppedPolygon, Location, Locator, LocatorConfig};
pub use crate::segmenter::{default_structuring_element, Segmenter, SegmenterConfig};

#[doc(inline)]
pub use sldc_image as image;

#[doc(inline)]
pub use sldc_imgproc as imgproc;
