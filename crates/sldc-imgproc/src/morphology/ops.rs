use rayon::prelude::*;
use sldc_image::{Image, ImageError};

use super::{Kernel, MorphologyError};

/// Morphological operation applied by [`morphology_ex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphOp {
    /// Minimum over the neighborhood.
    Erode,
    /// Maximum over the neighborhood.
    Dilate,
    /// Erosion followed by dilation.
    Open,
    /// Dilation followed by erosion.
    Close,
}

fn check_sizes<T, const C: usize>(
    src: &Image<T, C>,
    dst: &Image<T, C>,
) -> Result<(), MorphologyError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        )
        .into());
    }
    Ok(())
}

// Neighbors falling outside the image are skipped, so the border never
// erodes or dilates the image content.
fn apply_kernel<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    offsets: &[(isize, isize)],
    reduce: fn(T, T) -> T,
) where
    T: Copy + Send + Sync,
{
    let width = src.width();
    let height = src.height();
    if width == 0 || height == 0 {
        return;
    }

    let src_data = src.as_slice();

    dst.as_slice_mut()
        .par_chunks_exact_mut(width * C)
        .enumerate()
        .for_each(|(y, row_chunk)| {
            for x in 0..width {
                for c in 0..C {
                    let mut acc: Option<T> = None;

                    for &(dy, dx) in offsets {
                        let ny = y as isize + dy;
                        let nx = x as isize + dx;
                        if ny < 0 || nx < 0 || ny >= height as isize || nx >= width as isize {
                            continue;
                        }

                        let v = src_data[(ny as usize * width + nx as usize) * C + c];
                        acc = Some(match acc {
                            None => v,
                            Some(a) => reduce(a, v),
                        });
                    }

                    row_chunk[x * C + c] = acc.unwrap_or(src_data[(y * width + x) * C + c]);
                }
            }
        });
}

/// Dilate an image using a [`Kernel`].
///
/// Dilation expands white regions in the image. Each pixel is replaced
/// by the maximum value in the neighborhood defined by the kernel.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image (will be overwritten).
/// * `kernel` - The morphological structuring element.
pub fn dilate<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel: &Kernel,
) -> Result<(), MorphologyError>
where
    T: Copy + Ord + Send + Sync,
{
    morphology_ex(src, dst, MorphOp::Dilate, kernel, 1)
}

/// Erode an image using a [`Kernel`].
///
/// Erosion shrinks white regions in the image. Each pixel is replaced
/// by the minimum value in the neighborhood defined by the kernel.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image (will be overwritten).
/// * `kernel` - The morphological structuring element.
pub fn erode<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel: &Kernel,
) -> Result<(), MorphologyError>
where
    T: Copy + Ord + Send + Sync,
{
    morphology_ex(src, dst, MorphOp::Erode, kernel, 1)
}

/// Opening: `iterations` erosions followed by `iterations` dilations.
///
/// Removes small objects and smooths object boundaries.
pub fn open<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel: &Kernel,
    iterations: usize,
) -> Result<(), MorphologyError>
where
    T: Copy + Ord + Send + Sync,
{
    morphology_ex(src, dst, MorphOp::Open, kernel, iterations)
}

/// Closing: `iterations` dilations followed by `iterations` erosions.
///
/// Fills small holes and merges nearby objects.
pub fn close<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel: &Kernel,
    iterations: usize,
) -> Result<(), MorphologyError>
where
    T: Copy + Ord + Send + Sync,
{
    morphology_ex(src, dst, MorphOp::Close, kernel, iterations)
}

/// Apply a morphological operation `iterations` times.
///
/// Compound operations repeat each of their stages, e.g. a closing with two
/// iterations dilates twice and then erodes twice. Zero iterations copies the
/// source into the destination.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image (will be overwritten).
/// * `op` - The operation to apply.
/// * `kernel` - The morphological structuring element.
/// * `iterations` - How many times each stage is repeated.
///
/// # Example
///
/// ```
/// use sldc_image::{Image, ImageSize};
/// use sldc_imgproc::morphology::{morphology_ex, Kernel, KernelShape, MorphOp};
///
/// let mut data = vec![0u8; 25];
/// data[12] = 255;
/// let image = Image::<u8, 1>::new(ImageSize { width: 5, height: 5 }, data).unwrap();
/// let mut opened = Image::<u8, 1>::from_size_val(image.size(), 0).unwrap();
///
/// let kernel = Kernel::new(KernelShape::Box { size: 3 });
/// morphology_ex(&image, &mut opened, MorphOp::Open, &kernel, 1).unwrap();
/// assert!(opened.as_slice().iter().all(|&v| v == 0));
/// ```
pub fn morphology_ex<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    op: MorphOp,
    kernel: &Kernel,
    iterations: usize,
) -> Result<(), MorphologyError>
where
    T: Copy + Ord + Send + Sync,
{
    check_sizes(src, dst)?;
    kernel.validate()?;

    let erode_pass: fn(T, T) -> T = Ord::min;
    let dilate_pass: fn(T, T) -> T = Ord::max;
    let stages = match op {
        MorphOp::Erode => vec![erode_pass],
        MorphOp::Dilate => vec![dilate_pass],
        MorphOp::Open => vec![erode_pass, dilate_pass],
        MorphOp::Close => vec![dilate_pass, erode_pass],
    };

    let offsets = kernel.offsets();
    let mut current = src.clone();
    let mut scratch = src.clone();

    for reduce in stages {
        for _ in 0..iterations {
            apply_kernel(&current, &mut scratch, &offsets, reduce);
            std::mem::swap(&mut current, &mut scratch);
        }
    }

    dst.as_slice_mut().copy_from_slice(current.as_slice());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphology::KernelShape;
    use sldc_image::ImageSize;

    fn square_image(size: usize, on: &[(usize, usize)]) -> Result<Image<u8, 1>, ImageError> {
        let mut img = Image::from_size_val(
            ImageSize {
                width: size,
                height: size,
            },
            0u8,
        )?;
        for &(x, y) in on {
            img.set_pixel(x, y, 0, 255)?;
        }
        Ok(img)
    }

    #[test]
    fn dilate_single_pixel() -> Result<(), MorphologyError> {
        let src = square_image(5, &[(2, 2)])?;
        let mut dst = Image::from_size_val(src.size(), 0u8)?;

        dilate(&src, &mut dst, &Kernel::new(KernelShape::Cross { size: 3 }))?;

        #[rustfmt::skip]
        let expected = [
            0, 0, 0, 0, 0,
            0, 0, 255, 0, 0,
            0, 255, 255, 255, 0,
            0, 0, 255, 0, 0,
            0, 0, 0, 0, 0,
        ];
        assert_eq!(dst.as_slice(), expected);

        Ok(())
    }

    #[test]
    fn erode_ignores_border() -> Result<(), MorphologyError> {
        let src = Image::<u8, 1>::from_size_val(
            ImageSize {
                width: 4,
                height: 3,
            },
            255,
        )?;
        let mut dst = Image::from_size_val(src.size(), 0u8)?;

        erode(&src, &mut dst, &Kernel::new(KernelShape::Box { size: 3 }))?;
        assert!(dst.as_slice().iter().all(|&v| v == 255));

        Ok(())
    }

    #[test]
    fn open_removes_single_pixel_speck() -> Result<(), MorphologyError> {
        let src = square_image(5, &[(2, 2)])?;
        let mut dst = Image::from_size_val(src.size(), 0u8)?;

        open(&src, &mut dst, &Kernel::new(KernelShape::Box { size: 3 }), 1)?;
        assert!(dst.as_slice().iter().all(|&v| v == 0));

        Ok(())
    }

    #[test]
    fn close_fills_single_pixel_hole() -> Result<(), MorphologyError> {
        let mut src = Image::<u8, 1>::from_size_val(
            ImageSize {
                width: 5,
                height: 5,
            },
            255,
        )?;
        src.set_pixel(2, 2, 0, 0)?;
        let mut dst = Image::from_size_val(src.size(), 0u8)?;

        close(&src, &mut dst, &Kernel::new(KernelShape::Box { size: 3 }), 1)?;
        assert!(dst.as_slice().iter().all(|&v| v == 255));

        Ok(())
    }

    #[test]
    fn close_iterations_bridge_wider_gaps() -> Result<(), MorphologyError> {
        // two vertical bars four columns apart
        let on = (0..9)
            .flat_map(|y| [(1, y), (6, y)])
            .collect::<Vec<_>>();
        let src = square_image(9, &on)?;
        let kernel = Kernel::new(KernelShape::Box { size: 3 });

        let mut once = Image::from_size_val(src.size(), 0u8)?;
        close(&src, &mut once, &kernel, 1)?;
        assert_eq!(once.get_pixel(3, 4, 0)?, &0);

        let mut twice = Image::from_size_val(src.size(), 0u8)?;
        close(&src, &mut twice, &kernel, 2)?;
        assert_eq!(twice.get_pixel(3, 4, 0)?, &255);
        assert_eq!(twice.get_pixel(4, 4, 0)?, &255);

        Ok(())
    }

    #[test]
    fn zero_iterations_copies() -> Result<(), MorphologyError> {
        let src = square_image(5, &[(2, 2)])?;
        let mut dst = Image::from_size_val(src.size(), 0u8)?;

        morphology_ex(
            &src,
            &mut dst,
            MorphOp::Open,
            &Kernel::new(KernelShape::Box { size: 3 }),
            0,
        )?;
        assert_eq!(dst, src);

        Ok(())
    }

    #[test]
    fn invalid_inputs() -> Result<(), MorphologyError> {
        let src = square_image(5, &[(2, 2)])?;
        let mut dst = Image::from_size_val(
            ImageSize {
                width: 4,
                height: 5,
            },
            0u8,
        )?;
        let kernel = Kernel::new(KernelShape::Box { size: 3 });

        assert_eq!(
            dilate(&src, &mut dst, &kernel),
            Err(MorphologyError::Image(ImageError::InvalidImageSize(
                5, 5, 4, 5
            )))
        );

        let mut dst = Image::from_size_val(src.size(), 0u8)?;
        assert_eq!(
            erode(&src, &mut dst, &Kernel::new(KernelShape::Box { size: 0 })),
            Err(MorphologyError::EmptyKernel)
        );

        Ok(())
    }
}
