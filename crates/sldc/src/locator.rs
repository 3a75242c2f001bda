use geo::algorithm::orient::{Direction, Orient};
use geo::{AffineOps, Coord, LineString, Polygon};
use log::{debug, warn};
use sldc_image::Image;
use sldc_imgproc::contours::{find_contours, HierarchyEntry, Point};

use crate::error::LocatorError;
use crate::transform::translation;
use crate::validity::{explain_validity, Invalidity};

/// Configuration of the [`Locator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LocatorConfig {
    /// Outer contours with fewer points are discarded before building a polygon.
    pub min_exterior_points: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            min_exterior_points: 4,
        }
    }
}

/// Why a contour did not produce a polygon.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum DropReason {
    /// The outer contour has too few points to enclose an area.
    #[error("Exterior has only {0} points")]
    TooFewPoints(usize),

    /// The polygon built from the contour is not valid.
    #[error(transparent)]
    Invalid(#[from] Invalidity),
}

/// A contour that was discarded by [`Locator::locate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DroppedPolygon {
    /// Index of the outer contour in the tracer output.
    pub contour: usize,
    /// The diagnostic.
    pub reason: DropReason,
}

/// Result of [`Locator::locate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    /// The valid polygons, exterior counter-clockwise and holes clockwise.
    pub polygons: Vec<Polygon<f64>>,
    /// The contours that were discarded, with the reason.
    pub dropped: Vec<DroppedPolygon>,
}

impl Location {
    /// Number of located polygons.
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// Whether no polygon was located.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    fn drop_contour(&mut self, contour: usize, reason: DropReason) {
        warn!("Dropping contour {contour}: {reason}");
        self.dropped.push(DroppedPolygon { contour, reason });
    }
}

/// Extracts polygons with holes from binary masks.
///
/// Every connected foreground component becomes one polygon whose exterior is
/// the outer border of the component and whose interiors are the borders of
/// the background regions it encloses. Islands inside holes become separate
/// polygons.
///
/// # Example
///
/// ```
/// use sldc::image::{Image, ImageSize};
/// use sldc::Locator;
///
/// let mut mask = Image::<u8, 1>::from_size_val(ImageSize { width: 10, height: 10 }, 0).unwrap();
/// for y in 3..=6 {
///     for x in 3..=6 {
///         mask.set_pixel(x, y, 0, 255).unwrap();
///     }
/// }
///
/// let location = Locator::default().locate(&mask, Some((100, 200))).unwrap();
/// assert_eq!(location.len(), 1);
/// assert!(location.polygons[0].exterior().coords().all(|c| c.x >= 103.0 && c.y >= 203.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Locator {
    config: LocatorConfig,
}

impl Locator {
    /// Create a locator with the given configuration.
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    /// Get the locator configuration.
    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Extract the polygons of the foreground components of `mask`.
    ///
    /// # Arguments
    ///
    /// * `mask` - A binary mask, 0 for background and 255 for foreground.
    /// * `offset` - The `(col, row)` position of the mask top-left pixel in the
    ///   parent image. Polygons are translated by it.
    ///
    /// # Errors
    ///
    /// Fails if the mask holds values other than 0 and 255, or if the traced
    /// contour hierarchy is malformed. Invalid polygons are not errors, they
    /// are reported in [`Location::dropped`].
    pub fn locate(
        &self,
        mask: &Image<u8, 1>,
        offset: Option<(i64, i64)>,
    ) -> Result<Location, LocatorError> {
        check_binary(mask)?;

        let (contours, hierarchy) = find_contours(mask)?;

        let mut location = Location::default();
        if contours.is_empty() {
            debug!("No contour found in {} mask", mask.size());
            return Ok(location);
        }
        if hierarchy.len() != contours.len() {
            return Err(LocatorError::Hierarchy(
                hierarchy.len(),
                "hierarchy and contour counts differ",
            ));
        }

        let transform = translation(offset);
        let mut visited = vec![false; contours.len()];

        let mut top = Some(0);
        while let Some(index) = top {
            let entry = visit(&hierarchy, &mut visited, index)?;
            let exterior = &contours[index];

            if exterior.len() < self.config.min_exterior_points {
                location.drop_contour(index, DropReason::TooFewPoints(exterior.len()));
            } else {
                let mut interiors = Vec::new();
                let mut child = entry.first_child;
                while let Some(sub) = child {
                    child = visit(&hierarchy, &mut visited, sub)?.next;
                    interiors.push(ring(&contours[sub]));
                }

                let polygon = Polygon::new(ring(exterior), interiors).affine_transform(&transform);
                match explain_validity(&polygon) {
                    Some(invalidity) => location.drop_contour(index, invalidity.into()),
                    None => location.polygons.push(polygon.orient(Direction::Default)),
                }
            }

            top = entry.next;
        }

        debug!(
            "Located {} polygons from {} contours, {} dropped",
            location.polygons.len(),
            contours.len(),
            location.dropped.len()
        );

        Ok(location)
    }
}

fn check_binary(mask: &Image<u8, 1>) -> Result<(), LocatorError> {
    match mask
        .as_slice()
        .iter()
        .enumerate()
        .find(|&(_, &v)| v != 0 && v != 255)
    {
        Some((i, &value)) => Err(LocatorError::NonBinaryMask {
            x: i % mask.width(),
            y: i / mask.width(),
            value,
        }),
        None => Ok(()),
    }
}

// Marks a contour as visited, rejecting links out of range and sibling cycles.
fn visit<'a>(
    hierarchy: &'a [HierarchyEntry],
    visited: &mut [bool],
    index: usize,
) -> Result<&'a HierarchyEntry, LocatorError> {
    let (Some(entry), Some(seen)) = (hierarchy.get(index), visited.get_mut(index)) else {
        return Err(LocatorError::Hierarchy(index, "link out of range"));
    };
    if *seen {
        return Err(LocatorError::Hierarchy(index, "contour visited twice"));
    }
    *seen = true;
    Ok(entry)
}

fn ring(points: &[Point]) -> LineString<f64> {
    points
        .iter()
        .map(|p| Coord {
            x: f64::from(p.x),
            y: f64::from(p.y),
        })
        .collect()
}
