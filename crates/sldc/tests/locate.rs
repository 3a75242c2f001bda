use geo::{AffineOps, Area};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sldc::image::{Image, ImageError, ImageSize};
use sldc::transform::translation;
use sldc::validity::is_valid;
use sldc::{Locator, LocatorError};

// filled rectangles with random holes punched in
fn random_mask(seed: u64, width: usize, height: usize) -> Result<Image<u8, 1>, ImageError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut mask = Image::from_size_val(ImageSize { width, height }, 0u8)?;
    for _ in 0..12 {
        let w = rng.random_range(2..16);
        let h = rng.random_range(2..16);
        let x0 = rng.random_range(0..width - w);
        let y0 = rng.random_range(0..height - h);
        let value = if rng.random_bool(0.75) { 255 } else { 0 };
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.set_pixel(x, y, 0, value)?;
            }
        }
    }
    Ok(mask)
}

#[test]
fn translation_law() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();

    let locator = Locator::default();
    for seed in 0..8 {
        let mask = random_mask(seed, 64, 48)?;
        let offset = (seed as i64 * 1000 - 3000, 512 - seed as i64 * 37);

        let base = locator.locate(&mask, None)?;
        let moved = locator.locate(&mask, Some(offset))?;

        let expected = base
            .polygons
            .iter()
            .map(|p| p.affine_transform(&translation(Some(offset))))
            .collect::<Vec<_>>();
        assert_eq!(moved.polygons, expected, "seed {seed}");
        assert_eq!(moved.dropped.len(), base.dropped.len(), "seed {seed}");
    }

    Ok(())
}

#[test]
fn deterministic() -> Result<(), Box<dyn std::error::Error>> {
    let locator = Locator::default();
    let mask = random_mask(42, 96, 96)?;

    let first = locator.locate(&mask, Some((7, 9)))?;
    let second = locator.locate(&mask, Some((7, 9)))?;
    assert_eq!(first, second);

    Ok(())
}

#[test]
fn located_polygons_are_valid() -> Result<(), Box<dyn std::error::Error>> {
    let locator = Locator::default();
    for seed in 100..110 {
        let mask = random_mask(seed, 80, 80)?;
        let location = locator.locate(&mask, None)?;
        for polygon in &location.polygons {
            assert!(is_valid(polygon), "seed {seed}");
            assert!(polygon.signed_area() > 0.0, "seed {seed}");
        }
    }

    Ok(())
}

#[test]
fn rectangle_area_at_pixel_centers() -> Result<(), Box<dyn std::error::Error>> {
    for (w, h) in [(2, 2), (3, 7), (10, 4)] {
        let mut mask = Image::from_size_val(
            ImageSize {
                width: 20,
                height: 20,
            },
            0u8,
        )?;
        for y in 5..5 + h {
            for x in 4..4 + w {
                mask.set_pixel(x, y, 0, 255)?;
            }
        }

        let location = Locator::default().locate(&mask, None)?;
        assert_eq!(location.len(), 1);
        assert!(location.polygons[0].interiors().is_empty());
        approx::assert_relative_eq!(
            location.polygons[0].unsigned_area(),
            ((w - 1) * (h - 1)) as f64
        );
    }

    Ok(())
}

#[test]
fn non_binary_mask_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut mask = random_mask(3, 32, 32)?;
    mask.set_pixel(31, 31, 0, 128)?;

    let res = Locator::default().locate(&mask, None);
    assert_eq!(
        res,
        Err(LocatorError::NonBinaryMask {
            x: 31,
            y: 31,
            value: 128
        })
    );

    Ok(())
}
