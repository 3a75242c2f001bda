mod error;
pub use error::MorphologyError;

mod kernel;
pub use kernel::{box_kernel, cross_kernel, ellipse_kernel, Kernel, KernelShape};

mod ops;
pub use ops::{close, dilate, erode, morphology_ex, open, MorphOp};
