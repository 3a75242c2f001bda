use crate::parallel;
use sldc_image::{Image, ImageError};

/// Convert an RGB8 image to grayscale using the formula:
///
/// Y = (4899 * R + 9617 * G + 1868 * B + 8192) >> 14
///
/// These are the 0.299, 0.587 and 0.114 luma weights in 14-bit fixed point,
/// rounded to nearest like OpenCV's `COLOR_RGB2GRAY`.
///
/// # Arguments
///
/// * `src` - The input RGB8 image.
/// * `dst` - The output grayscale image.
///
/// Precondition: the input and output images must have the same size.
///
/// # Example
///
/// ```
/// use sldc_image::{Image, ImageSize};
/// use sldc_imgproc::color::gray_from_rgb_u8;
///
/// let image = Image::<u8, 3>::new(
///     ImageSize {
///         width: 2,
///         height: 1,
///     },
///     vec![255, 255, 255, 0, 0, 0],
/// )
/// .unwrap();
///
/// let mut gray = Image::<u8, 1>::from_size_val(image.size(), 0).unwrap();
///
/// gray_from_rgb_u8(&image, &mut gray).unwrap();
/// assert_eq!(gray.as_slice(), &[255, 0]);
/// ```
pub fn gray_from_rgb_u8(src: &Image<u8, 3>, dst: &mut Image<u8, 1>) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        let r = u32::from(src_pixel[0]);
        let g = u32::from(src_pixel[1]);
        let b = u32::from(src_pixel[2]);
        dst_pixel[0] = ((r * 4899 + g * 9617 + b * 1868 + 8192) >> 14) as u8;
    });

    Ok(())
}
