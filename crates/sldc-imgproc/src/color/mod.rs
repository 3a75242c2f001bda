mod deconvolution;
pub use deconvolution::*;

mod gray;
pub use gray::*;
