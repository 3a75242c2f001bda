use super::MorphologyError;

/// Shapes of morphological [`Kernel`]s.
///
/// All kernels are anchored at their center cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelShape {
    /// A square box structuring element.
    Box {
        /// The side length of the square kernel (size x size).
        size: usize,
    },

    /// A cross (plus) shaped structuring element.
    Cross {
        /// The side length of the square cross kernel (size x size).
        size: usize,
    },

    /// An ellipse (or disk) shaped structuring element inscribed in a
    /// `width` x `height` box.
    Ellipse {
        /// The width of the ellipse.
        width: usize,
        /// The height of the ellipse.
        height: usize,
    },
}

/// A morphological structuring element.
///
/// The kernel stores a row-major binary mask where 1 marks the cells included
/// in the neighborhood and 0 the excluded ones. The anchor is the cell at
/// (`height / 2`, `width / 2`).
///
/// # Example
///
/// ```rust
/// use sldc_imgproc::morphology::{Kernel, KernelShape};
///
/// let kernel = Kernel::new(KernelShape::Box { size: 3 });
/// assert_eq!(kernel.width(), 3);
/// assert_eq!(kernel.height(), 3);
/// assert_eq!(kernel.pad(), (1, 1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawKernel"))]
pub struct Kernel {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawKernel {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<RawKernel> for Kernel {
    type Error = MorphologyError;

    fn try_from(raw: RawKernel) -> Result<Self, Self::Error> {
        Kernel::from_data(raw.data, raw.width, raw.height)
    }
}

impl Kernel {
    /// Create a morphological kernel from a shape.
    pub fn new(shape: KernelShape) -> Self {
        match shape {
            KernelShape::Box { size } => box_kernel(size),
            KernelShape::Cross { size } => cross_kernel(size),
            KernelShape::Ellipse { width, height } => ellipse_kernel(width, height),
        }
    }

    /// Create a kernel from row-major data. Any non-zero value is an active cell.
    ///
    /// # Errors
    ///
    /// Fails if the data length does not match the shape, if the kernel is
    /// empty or if no cell is active.
    pub fn from_data(data: Vec<u8>, width: usize, height: usize) -> Result<Self, MorphologyError> {
        if data.len() != width * height {
            return Err(MorphologyError::InvalidKernelShape(
                data.len(),
                width,
                height,
            ));
        }

        let kernel = Kernel {
            data: data.into_iter().map(|v| u8::from(v != 0)).collect(),
            width,
            height,
        };
        kernel.validate()?;

        Ok(kernel)
    }

    /// Get a reference to the kernel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the width of the kernel.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get the height of the kernel.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get the padding for the kernel (offset of the anchor from the top-left cell).
    pub fn pad(&self) -> (usize, usize) {
        (self.height / 2, self.width / 2)
    }

    /// Check that the kernel can be used by the morphology operators.
    pub fn validate(&self) -> Result<(), MorphologyError> {
        if self.data.is_empty() {
            return Err(MorphologyError::EmptyKernel);
        }
        if self.data.iter().all(|&v| v == 0) {
            return Err(MorphologyError::AllKernelElementsInactive);
        }
        Ok(())
    }

    /// Offsets `(dy, dx)` of the active cells relative to the anchor.
    pub(crate) fn offsets(&self) -> Vec<(isize, isize)> {
        let (pad_h, pad_w) = self.pad();
        (0..self.height)
            .flat_map(|kh| (0..self.width).map(move |kw| (kh, kw)))
            .filter(|&(kh, kw)| self.data[kh * self.width + kw] != 0)
            .map(|(kh, kw)| (kh as isize - pad_h as isize, kw as isize - pad_w as isize))
            .collect()
    }
}

/// Create a box structuring element filled with 1s.
pub fn box_kernel(size: usize) -> Kernel {
    Kernel {
        data: vec![1u8; size * size],
        width: size,
        height: size,
    }
}

/// Create a cross structuring element with 1s along the center row and column.
pub fn cross_kernel(size: usize) -> Kernel {
    let mut data = vec![0u8; size * size];
    let mid = size / 2;

    for j in 0..size {
        data[mid * size + j] = 1;
    }

    for i in 0..size {
        data[i * size + mid] = 1;
    }

    Kernel {
        data,
        width: size,
        height: size,
    }
}

/// Create an ellipse structuring element with 1s inside the inscribed ellipse.
///
/// A 7x7 ellipse is the classic approximate disk:
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
pub fn ellipse_kernel(width: usize, height: usize) -> Kernel {
    let mut data = vec![0u8; width * height];
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let rx = width as f32 / 2.0;
    let ry = height as f32 / 2.0;

    for i in 0..height {
        for j in 0..width {
            let x = j as f32 - cx;
            let y = i as f32 - cy;
            if (x * x) / (rx * rx) + (y * y) / (ry * ry) <= 1.0 {
                data[i * width + j] = 1;
            }
        }
    }

    Kernel {
        data,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_kernel() {
        let kernel = Kernel::new(KernelShape::Box { size: 3 });
        assert_eq!(kernel.width(), 3);
        assert_eq!(kernel.height(), 3);
        assert!(kernel.data().iter().all(|&x| x == 1));
        assert_eq!(kernel.offsets().len(), 9);
    }

    #[test]
    fn test_cross_kernel() {
        let kernel = Kernel::new(KernelShape::Cross { size: 3 });
        #[rustfmt::skip]
        let expected = [
            0, 1, 0,
            1, 1, 1,
            0, 1, 0,
        ];
        assert_eq!(kernel.data(), expected);
    }

    #[test]
    fn test_ellipse_kernel_is_disk() {
        let kernel = Kernel::new(KernelShape::Ellipse {
            width: 7,
            height: 7,
        });
        #[rustfmt::skip]
        let expected = [
            0, 0, 1, 1, 1, 0, 0,
            0, 1, 1, 1, 1, 1, 0,
            1, 1, 1, 1, 1, 1, 1,
            1, 1, 1, 1, 1, 1, 1,
            1, 1, 1, 1, 1, 1, 1,
            0, 1, 1, 1, 1, 1, 0,
            0, 0, 1, 1, 1, 0, 0,
        ];
        assert_eq!(kernel.data(), expected);
    }

    #[test]
    fn test_kernel_padding() {
        let kernel = Kernel::new(KernelShape::Box { size: 5 });
        assert_eq!(kernel.pad(), (2, 2));
    }

    #[test]
    fn test_from_data() -> Result<(), MorphologyError> {
        let kernel = Kernel::from_data(vec![0, 7, 0, 1, 1, 1], 3, 2)?;
        assert_eq!(kernel.data(), &[0, 1, 0, 1, 1, 1]);
        assert_eq!(kernel.offsets(), vec![(-1, 0), (0, -1), (0, 0), (0, 1)]);

        assert_eq!(
            Kernel::from_data(vec![1, 1], 3, 1),
            Err(MorphologyError::InvalidKernelShape(2, 3, 1))
        );
        assert_eq!(
            Kernel::from_data(vec![], 0, 0),
            Err(MorphologyError::EmptyKernel)
        );
        assert_eq!(
            Kernel::from_data(vec![0; 9], 3, 3),
            Err(MorphologyError::AllKernelElementsInactive)
        );

        Ok(())
    }
}
