use sldc_image::ImageError;
use sldc_imgproc::contours::ContourError;
use sldc_imgproc::morphology::MorphologyError;

/// An error type for the locator.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum LocatorError {
    /// The mask holds a value other than 0 or 255.
    #[error("Mask value {value} at ({x}, {y}) is neither 0 nor 255")]
    NonBinaryMask {
        /// Column of the offending pixel.
        x: usize,
        /// Row of the offending pixel.
        y: usize,
        /// The offending value.
        value: u8,
    },

    /// The contour hierarchy links out of range or loops.
    #[error("Malformed contour hierarchy at contour {0}: {1}")]
    Hierarchy(usize, &'static str),

    /// Error raised by the contour tracer.
    #[error(transparent)]
    Contour(#[from] ContourError),

    /// Error related to the input image.
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// An error type for the segmenter.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SegmenterError {
    /// Error raised by the morphological operators or the structuring element.
    #[error(transparent)]
    Morphology(#[from] MorphologyError),

    /// Error related to the input or intermediate images.
    #[error(transparent)]
    Image(#[from] ImageError),
}
