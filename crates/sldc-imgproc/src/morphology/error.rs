use sldc_image::ImageError;

/// Errors related to morphological operations.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MorphologyError {
    /// The kernel has no elements.
    #[error("The structuring element is empty")]
    EmptyKernel,

    /// All elements in the kernel are inactive.
    #[error("The structuring element has no active elements")]
    AllKernelElementsInactive,

    /// The kernel data length does not match its width and height.
    #[error("Kernel data length ({0}) does not match its shape ({1}x{2})")]
    InvalidKernelShape(usize, usize, usize),

    /// Error related to the input or output images.
    #[error(transparent)]
    Image(#[from] ImageError),
}
