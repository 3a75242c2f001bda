use log::debug;
use sldc_image::Image;
use sldc_imgproc::color::{gray_from_rgb_u8, ColorDeconvolution};
use sldc_imgproc::morphology::{morphology_ex, Kernel, KernelShape, MorphOp};
use sldc_imgproc::threshold::threshold_binary_inverse;

use crate::error::SegmenterError;

/// The 7x7 disk used when no structuring element is configured.
///
/// ```text
/// 0011100
/// 0111110
/// 1111111
/// 1111111
/// 1111111
/// 0111110
/// 0011100
/// ```
pub fn default_structuring_element() -> Kernel {
    Kernel::new(KernelShape::Ellipse {
        width: 7,
        height: 7,
    })
}

/// Parameters of the [`Segmenter`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SegmenterConfig {
    /// Gray levels above this value are background.
    pub threshold: u8,
    /// Structuring element of the morphological stages, the 7x7 disk when `None`.
    pub struct_elem: Option<Kernel>,
    /// Iterations of the first closing, the opening and the second closing.
    pub nb_morph_iter: [usize; 3],
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            threshold: 120,
            struct_elem: None,
            nb_morph_iter: [1, 3, 7],
        }
    }
}

/// Turns RGB slide tiles into binary masks of the stained cells.
///
/// The pipeline is a color deconvolution, a grayscale conversion, an inverse
/// threshold and three morphological stages: a closing, an opening and a
/// second closing.
///
/// # Example
///
/// ```
/// use sldc::image::{Image, ImageSize};
/// use sldc::imgproc::color::IdentityDeconvolution;
/// use sldc::{Segmenter, SegmenterConfig};
///
/// let segmenter = Segmenter::new(IdentityDeconvolution, SegmenterConfig::default()).unwrap();
///
/// let image = Image::<u8, 3>::from_size_val(ImageSize { width: 16, height: 16 }, 200).unwrap();
/// let mask = segmenter.segment(&image).unwrap();
/// assert!(mask.as_slice().iter().all(|&v| v == 0));
/// ```
#[derive(Debug, Clone)]
pub struct Segmenter<D> {
    deconvolution: D,
    config: SegmenterConfig,
    kernel: Kernel,
}

impl<D: ColorDeconvolution> Segmenter<D> {
    /// Create a segmenter.
    ///
    /// # Errors
    ///
    /// Fails if the configured structuring element is empty or has no active cell.
    pub fn new(deconvolution: D, config: SegmenterConfig) -> Result<Self, SegmenterError> {
        let kernel = config
            .struct_elem
            .clone()
            .unwrap_or_else(default_structuring_element);
        kernel.validate()?;

        Ok(Self {
            deconvolution,
            config,
            kernel,
        })
    }

    /// Get the segmenter configuration.
    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Get the structuring element of the morphological stages.
    pub fn structuring_element(&self) -> &Kernel {
        &self.kernel
    }

    /// Segment an RGB tile.
    ///
    /// Returns a mask of the same size where 255 marks the foreground.
    pub fn segment(&self, image: &Image<u8, 3>) -> Result<Image<u8, 1>, SegmenterError> {
        let mut mask = self.threshold_mask(image)?;
        let mut scratch = Image::from_size_val(mask.size(), 0u8)?;

        let [first_close, open, second_close] = self.config.nb_morph_iter;
        let stages = [
            (MorphOp::Close, first_close),
            (MorphOp::Open, open),
            (MorphOp::Close, second_close),
        ];

        for (op, iterations) in stages {
            morphology_ex(&mask, &mut scratch, op, &self.kernel, iterations)?;
            std::mem::swap(&mut mask, &mut scratch);
            debug!(
                "{op:?} x{iterations}: {} foreground pixels",
                foreground_count(&mask)
            );
        }

        Ok(mask)
    }

    /// Run the color, grayscale and threshold stages only.
    ///
    /// The result is the mask before any morphological cleanup.
    pub fn threshold_mask(&self, image: &Image<u8, 3>) -> Result<Image<u8, 1>, SegmenterError> {
        let mut deconvolved = Image::<u8, 3>::from_size_val(image.size(), 0)?;
        self.deconvolution.transform(image, &mut deconvolved)?;

        let mut gray = Image::<u8, 1>::from_size_val(image.size(), 0)?;
        gray_from_rgb_u8(&deconvolved, &mut gray)?;

        let mut mask = Image::<u8, 1>::from_size_val(image.size(), 0)?;
        threshold_binary_inverse(&gray, &mut mask, self.config.threshold, 255)?;

        debug!(
            "Threshold {}: {} foreground pixels in {} tile",
            self.config.threshold,
            foreground_count(&mask),
            image.size()
        );

        Ok(mask)
    }
}

fn foreground_count(mask: &Image<u8, 1>) -> usize {
    mask.as_slice().iter().filter(|&&v| v != 0).count()
}
