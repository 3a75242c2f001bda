use geo::AffineTransform;

/// Build the affine transform `x' = xx * x + xy * y + dx`, `y' = yx * x + yy * y + dy`.
///
/// # Example
///
/// ```
/// use geo::{coord, AffineOps, Point};
/// use sldc::transform::affine_transform;
///
/// let scale = affine_transform(2.0, 0.0, 0.0, 3.0, 1.0, -1.0);
/// let p = Point::new(1.0, 1.0).affine_transform(&scale);
/// assert_eq!(p.0, coord! { x: 3.0, y: 2.0 });
/// ```
pub fn affine_transform(xx: f64, xy: f64, yx: f64, yy: f64, dx: f64, dy: f64) -> AffineTransform<f64> {
    AffineTransform::new(xx, xy, dx, yx, yy, dy)
}

/// Translation by a `(col, row)` offset, the identity when `offset` is `None`.
pub fn translation(offset: Option<(i64, i64)>) -> AffineTransform<f64> {
    let (col, row) = offset.unwrap_or((0, 0));
    affine_transform(1.0, 0.0, 0.0, 1.0, col as f64, row as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, AffineOps};

    #[test]
    fn translation_moves_polygon() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 2.0),
        ];

        let moved = square.affine_transform(&translation(Some((10, -3))));
        let expected = polygon![
            (x: 10.0, y: -3.0),
            (x: 12.0, y: -3.0),
            (x: 12.0, y: -1.0),
            (x: 10.0, y: -1.0),
        ];
        assert_eq!(moved, expected);

        assert_eq!(square.affine_transform(&translation(None)), square);
    }

    #[test]
    fn affine_coefficients() {
        let t = affine_transform(0.0, 1.0, 1.0, 0.0, 5.0, 7.0);
        let c = t.apply(geo::coord! { x: 2.0, y: 3.0 });
        approx::assert_relative_eq!(c.x, 8.0);
        approx::assert_relative_eq!(c.y, 9.0);
    }
}
