#![deny(missing_docs)]
//! Image types for the sldc segmentation pipeline

/// image representation for slide tiles and masks.
pub mod image;

/// Error types for the image module.
pub mod error;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
