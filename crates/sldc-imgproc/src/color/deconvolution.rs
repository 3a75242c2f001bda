use crate::parallel;
use glam::{DMat3, DVec3};
use sldc_image::{Image, ImageError};

/// Hematoxylin optical density vector (Ruifrok & Johnston).
pub const HEMATOXYLIN: [f64; 3] = [0.65, 0.70, 0.29];

/// Eosin optical density vector (Ruifrok & Johnston).
pub const EOSIN: [f64; 3] = [0.07, 0.99, 0.11];

/// DAB optical density vector (Ruifrok & Johnston).
pub const DAB: [f64; 3] = [0.27, 0.57, 0.78];

// Upper bound for the optical density of a fully dark pixel, -ln(1 / 255).
const MAX_OPTICAL_DENSITY: f64 = 5.541_263_545_158_426;

// Stain matrices closer to singular than this are rejected.
const MIN_DETERMINANT: f64 = 1e-12;

/// An error type for the stain deconvolution.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DeconvolutionError {
    /// A stain vector has zero length and cannot be normalized.
    #[error("Stain vector {0} has zero length")]
    ZeroStainVector(usize),

    /// The stain vectors are linearly dependent.
    #[error("Stain matrix is singular")]
    SingularStainMatrix,
}

/// A stain separation transform applied to RGB tiles before thresholding.
///
/// Implementations isolate the stain of interest and return an RGB image in
/// which darker pixels mean a stronger stain.
pub trait ColorDeconvolution {
    /// Transform `src` into `dst`.
    ///
    /// Precondition: the input and output images must have the same size.
    fn transform(&self, src: &Image<u8, 3>, dst: &mut Image<u8, 3>) -> Result<(), ImageError>;
}

impl<D: ColorDeconvolution + ?Sized> ColorDeconvolution for Box<D> {
    fn transform(&self, src: &Image<u8, 3>, dst: &mut Image<u8, 3>) -> Result<(), ImageError> {
        (**self).transform(src, dst)
    }
}

impl<D: ColorDeconvolution + ?Sized> ColorDeconvolution for &D {
    fn transform(&self, src: &Image<u8, 3>, dst: &mut Image<u8, 3>) -> Result<(), ImageError> {
        (**self).transform(src, dst)
    }
}

/// A deconvolution that copies its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityDeconvolution;

impl ColorDeconvolution for IdentityDeconvolution {
    fn transform(&self, src: &Image<u8, 3>, dst: &mut Image<u8, 3>) -> Result<(), ImageError> {
        if src.size() != dst.size() {
            return Err(ImageError::InvalidImageSize(
                src.cols(),
                src.rows(),
                dst.cols(),
                dst.rows(),
            ));
        }

        dst.as_slice_mut().copy_from_slice(src.as_slice());

        Ok(())
    }
}

/// Color deconvolution after Ruifrok & Johnston.
///
/// Each pixel is converted to optical density, projected onto the three stain
/// vectors and rebuilt from the kept stains only, so the output shows the
/// selected stains on a white background.
///
/// # Example
///
/// ```
/// use sldc_image::{Image, ImageSize};
/// use sldc_imgproc::color::{ColorDeconvolution, StainDeconvolution};
///
/// let deconvolution = StainDeconvolution::hematoxylin().unwrap();
///
/// let image = Image::<u8, 3>::from_size_val(ImageSize { width: 2, height: 2 }, 255).unwrap();
/// let mut out = Image::<u8, 3>::from_size_val(image.size(), 0).unwrap();
///
/// deconvolution.transform(&image, &mut out).unwrap();
/// assert!(out.as_slice().iter().all(|&v| v == 255));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StainDeconvolution {
    // columns are the normalized stain vectors: od = rgb_from_stains * concentrations
    rgb_from_stains: DMat3,
    stains_from_rgb: DMat3,
    keep: [bool; 3],
}

impl StainDeconvolution {
    /// Create a deconvolution from three stain optical density vectors.
    ///
    /// # Arguments
    ///
    /// * `stains` - One RGB optical density vector per stain, normalized internally.
    /// * `keep` - Which stains contribute to the rebuilt image.
    pub fn new(stains: [[f64; 3]; 3], keep: [bool; 3]) -> Result<Self, DeconvolutionError> {
        let mut columns = [DVec3::ZERO; 3];
        for (i, (column, stain)) in columns.iter_mut().zip(stains).enumerate() {
            let stain = DVec3::from_array(stain);
            let norm = stain.length();
            if norm <= f64::EPSILON {
                return Err(DeconvolutionError::ZeroStainVector(i));
            }
            *column = stain / norm;
        }

        let rgb_from_stains = DMat3::from_cols(columns[0], columns[1], columns[2]);
        if rgb_from_stains.determinant().abs() < MIN_DETERMINANT {
            return Err(DeconvolutionError::SingularStainMatrix);
        }

        Ok(Self {
            rgb_from_stains,
            stains_from_rgb: rgb_from_stains.inverse(),
            keep,
        })
    }

    /// Hematoxylin, eosin and DAB stains, keeping hematoxylin only.
    pub fn hematoxylin() -> Result<Self, DeconvolutionError> {
        Self::new([HEMATOXYLIN, EOSIN, DAB], [true, false, false])
    }

    /// Per-stain concentrations of an RGB pixel.
    pub fn concentrations(&self, rgb: [u8; 3]) -> [f64; 3] {
        let od = DVec3::from_array(rgb.map(optical_density));
        (self.stains_from_rgb * od).to_array()
    }

    fn rebuild(&self, concentrations: [f64; 3]) -> [u8; 3] {
        let mut kept = concentrations;
        for (conc, keep) in kept.iter_mut().zip(self.keep) {
            if !keep {
                *conc = 0.0;
            }
        }
        let od = self.rgb_from_stains * DVec3::from_array(kept);
        od.to_array().map(|v| {
            let v = v.clamp(0.0, MAX_OPTICAL_DENSITY);
            (255.0 * (-v).exp()).round().clamp(0.0, 255.0) as u8
        })
    }
}

impl ColorDeconvolution for StainDeconvolution {
    fn transform(&self, src: &Image<u8, 3>, dst: &mut Image<u8, 3>) -> Result<(), ImageError> {
        if src.size() != dst.size() {
            return Err(ImageError::InvalidImageSize(
                src.cols(),
                src.rows(),
                dst.cols(),
                dst.rows(),
            ));
        }

        parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
            let conc = self.concentrations([src_pixel[0], src_pixel[1], src_pixel[2]]);
            dst_pixel.copy_from_slice(&self.rebuild(conc));
        });

        Ok(())
    }
}

fn optical_density(v: u8) -> f64 {
    -(f64::from(v.max(1)) / 255.0).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sldc_image::ImageSize;

    fn stain_pixel(stain: [f64; 3], concentration: f64) -> [u8; 3] {
        let norm = stain.iter().map(|v| v * v).sum::<f64>().sqrt();
        stain.map(|v| (255.0 * (-(v / norm) * concentration).exp()).round() as u8)
    }

    #[test]
    fn identity_copies_input() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 2,
            height: 1,
        };
        let image = Image::<u8, 3>::new(size, vec![1, 2, 3, 4, 5, 6])?;
        let mut out = Image::<u8, 3>::from_size_val(size, 0)?;

        IdentityDeconvolution.transform(&image, &mut out)?;
        assert_eq!(out.as_slice(), image.as_slice());

        Ok(())
    }

    #[test]
    fn invert_stain_matrix() -> Result<(), DeconvolutionError> {
        let deconvolution = StainDeconvolution::hematoxylin()?;
        let product = deconvolution.rgb_from_stains * deconvolution.stains_from_rgb;
        assert!(product.abs_diff_eq(DMat3::IDENTITY, 1e-9), "{product}");

        // the columns hold the normalized stains
        let h = deconvolution.rgb_from_stains.x_axis;
        approx::assert_abs_diff_eq!(h.length(), 1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(h.y / h.x, 0.70 / 0.65, epsilon = 1e-12);

        Ok(())
    }

    #[test]
    fn hematoxylin_pixel_is_kept() -> Result<(), Box<dyn std::error::Error>> {
        let deconvolution = StainDeconvolution::hematoxylin()?;
        let pixel = stain_pixel(HEMATOXYLIN, 1.0);

        let conc = deconvolution.concentrations(pixel);
        approx::assert_abs_diff_eq!(conc[0], 1.0, epsilon = 0.05);
        approx::assert_abs_diff_eq!(conc[1], 0.0, epsilon = 0.05);

        let image = Image::<u8, 3>::new(
            ImageSize {
                width: 1,
                height: 1,
            },
            pixel.to_vec(),
        )?;
        let mut out = Image::<u8, 3>::from_size_val(image.size(), 0)?;
        deconvolution.transform(&image, &mut out)?;

        for (a, b) in out.as_slice().iter().zip(pixel.iter()) {
            assert!((*a as i32 - *b as i32).abs() <= 3, "{a} vs {b}");
        }

        Ok(())
    }

    #[test]
    fn eosin_pixel_is_removed() -> Result<(), Box<dyn std::error::Error>> {
        let deconvolution = StainDeconvolution::hematoxylin()?;
        let image = Image::<u8, 3>::new(
            ImageSize {
                width: 1,
                height: 1,
            },
            stain_pixel(EOSIN, 1.0).to_vec(),
        )?;
        let mut out = Image::<u8, 3>::from_size_val(image.size(), 0)?;
        deconvolution.transform(&image, &mut out)?;

        assert!(out.as_slice().iter().all(|&v| v >= 240), "{:?}", out.as_slice());

        Ok(())
    }

    #[test]
    fn degenerate_stains() {
        assert_eq!(
            StainDeconvolution::new([HEMATOXYLIN, [0.0; 3], DAB], [true; 3]),
            Err(DeconvolutionError::ZeroStainVector(1))
        );
        assert_eq!(
            StainDeconvolution::new([HEMATOXYLIN, HEMATOXYLIN, DAB], [true; 3]),
            Err(DeconvolutionError::SingularStainMatrix)
        );

        // coplanar stains: the third is the sum of the first two
        let sum = [
            HEMATOXYLIN[0] + EOSIN[0],
            HEMATOXYLIN[1] + EOSIN[1],
            HEMATOXYLIN[2] + EOSIN[2],
        ];
        assert_eq!(
            StainDeconvolution::new([HEMATOXYLIN, EOSIN, sum], [true; 3]),
            Err(DeconvolutionError::SingularStainMatrix)
        );
    }
}
