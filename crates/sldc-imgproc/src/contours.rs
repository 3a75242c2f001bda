//! Border following after Suzuki & Abe, "Topological structural analysis of
//! digitized binary images by border following" (1985).
//!
//! Foreground is 8-connected and holes are 4-connected. The image is traced on
//! a private label buffer with a one pixel zero frame, so the input is never
//! modified and regions touching the image border are closed.

use sldc_image::Image;

/// An error type for the contour tracing.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ContourError {
    /// The image is too large for 32-bit point coordinates and labels.
    #[error("Image of {0}x{1} pixels is too large for contour tracing")]
    ImageTooLarge(usize, usize),
}

/// A pixel position on a contour, as (column, row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    /// x-coordinate (column).
    pub x: i32,
    /// y-coordinate (row).
    pub y: i32,
}

impl Point {
    /// Construct a point at (x, y).
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Topology of one contour inside the flat contour list.
///
/// All links are indices into the same list; `None` means no such contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HierarchyEntry {
    /// The next contour at the same level.
    pub next: Option<usize>,
    /// The previous contour at the same level.
    pub previous: Option<usize>,
    /// The first contour nested directly inside this one.
    pub first_child: Option<usize>,
    /// The contour this one is nested in.
    pub parent: Option<usize>,
}

impl HierarchyEntry {
    /// The `[next, previous, first_child, parent]` encoding with `-1` for none.
    pub fn to_array(&self) -> [i64; 4] {
        let encode = |link: Option<usize>| link.map_or(-1, |i| i as i64);
        [
            encode(self.next),
            encode(self.previous),
            encode(self.first_child),
            encode(self.parent),
        ]
    }
}

/// Contours together with their parallel hierarchy.
pub type ContoursWithHierarchy = (Vec<Vec<Point>>, Vec<HierarchyEntry>);

struct Border {
    points: Vec<Point>,
    is_hole: bool,
    parent: Option<usize>,
}

// Neighbor offsets in clockwise order (y grows downwards), starting east.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

fn direction_index(dx: i32, dy: i32) -> usize {
    DIRECTIONS
        .iter()
        .position(|&d| d == (dx, dy))
        .unwrap_or(0)
}

/// Find the contours of the foreground regions of a binary image.
///
/// Every non-zero pixel is foreground. Contours are returned in raster
/// discovery order, so the first contour is always an outer border; hole
/// contours are stored in reverse tracing order. Points are compressed with
/// [`chain_approx_simple`].
///
/// The hierarchy is parallel to the contour list and has two levels: every
/// outer border is top level, including islands inside holes, and owns the
/// holes directly inside it.
///
/// # Arguments
///
/// * `src` - The binary source image.
///
/// # Example
///
/// ```
/// use sldc_image::{Image, ImageSize};
/// use sldc_imgproc::contours::{find_contours, Point};
///
/// #[rustfmt::skip]
/// let image = Image::<u8, 1>::new(
///     ImageSize { width: 5, height: 5 },
///     vec![
///         0, 0, 0, 0, 0,
///         0, 255, 255, 255, 0,
///         0, 255, 255, 255, 0,
///         0, 255, 255, 255, 0,
///         0, 0, 0, 0, 0,
///     ],
/// ).unwrap();
///
/// let (contours, hierarchy) = find_contours(&image).unwrap();
///
/// assert_eq!(contours.len(), 1);
/// assert_eq!(contours[0].len(), 4);
/// assert_eq!(contours[0][0], Point::new(1, 1));
/// assert_eq!(hierarchy[0].to_array(), [-1, -1, -1, -1]);
/// ```
pub fn find_contours(src: &Image<u8, 1>) -> Result<ContoursWithHierarchy, ContourError> {
    let width = src.width();
    let height = src.height();

    // labels must hold the border count and coordinates must fit in i32
    if width.saturating_add(2).saturating_mul(height.saturating_add(2)) >= i32::MAX as usize {
        return Err(ContourError::ImageTooLarge(width, height));
    }

    if width == 0 || height == 0 {
        return Ok((Vec::new(), Vec::new()));
    }

    let (contours, parents): (Vec<_>, Vec<_>) = trace_borders(src)
        .into_iter()
        .map(|b| {
            let parent = if b.is_hole { b.parent } else { None };
            (chain_approx_simple(&b.points), parent)
        })
        .unzip();

    Ok((contours, link_hierarchy(&parents)))
}

fn trace_borders(src: &Image<u8, 1>) -> Vec<Border> {
    let width = src.width();
    let padded_width = width + 2;
    let padded_height = src.height() + 2;

    let mut labels = vec![0i32; padded_width * padded_height];
    for (y, row) in src.as_slice().chunks_exact(width).enumerate() {
        for (x, &v) in row.iter().enumerate() {
            if v != 0 {
                labels[(y + 1) * padded_width + x + 1] = 1;
            }
        }
    }

    let at = |p: Point| p.y as usize * padded_width + p.x as usize;
    let step = |p: Point, dir: usize| {
        let (dx, dy) = DIRECTIONS[dir % 8];
        Point::new(p.x + dx, p.y + dy)
    };

    let mut borders: Vec<Border> = Vec::new();
    // border numbers start at 2, 1 is the frame
    let mut nbd = 1i32;

    for y in 1..padded_height - 1 {
        let mut lnbd = 1i32;

        for x in 1..padded_width - 1 {
            let curr = Point::new(x as i32, y as i32);
            let value = labels[at(curr)];
            if value == 0 {
                continue;
            }

            let start = if value == 1 && labels[at(step(curr, 4))] == 0 {
                Some((step(curr, 4), false))
            } else if value >= 1 && labels[at(step(curr, 0))] == 0 {
                if value > 1 {
                    lnbd = value;
                }
                Some((step(curr, 0), true))
            } else {
                None
            };

            if let Some((adjacent, is_hole)) = start {
                nbd += 1;

                let parent = if lnbd >= 2 {
                    let previous = (lnbd - 2) as usize;
                    if borders[previous].is_hole != is_hole {
                        Some(previous)
                    } else {
                        borders[previous].parent
                    }
                } else {
                    None
                };

                let mut points = follow_border(&mut labels, padded_width, curr, adjacent, nbd);
                if is_hole {
                    points.reverse();
                }

                borders.push(Border {
                    points,
                    is_hole,
                    parent,
                });
            }

            let value = labels[at(curr)];
            if value != 1 {
                lnbd = value.abs();
            }
        }
    }

    borders
}

// Follows one border starting at `start`, whose zero neighbor `adjacent`
// was found by the raster scan, labelling the visited pixels with `nbd`.
// Returned points are in image coordinates (frame removed).
fn follow_border(
    labels: &mut [i32],
    padded_width: usize,
    start: Point,
    adjacent: Point,
    nbd: i32,
) -> Vec<Point> {
    let at = |p: Point| p.y as usize * padded_width + p.x as usize;
    let step = |p: Point, dir: usize| {
        let (dx, dy) = DIRECTIONS[dir % 8];
        Point::new(p.x + dx, p.y + dy)
    };
    let unpad = |p: Point| Point::new(p.x - 1, p.y - 1);

    // clockwise search for the first non-zero neighbor
    let first_dir = direction_index(adjacent.x - start.x, adjacent.y - start.y);
    let first = (0..8)
        .map(|k| step(start, first_dir + k))
        .find(|&p| labels[at(p)] != 0);

    let Some(first) = first else {
        // isolated pixel
        labels[at(start)] = -nbd;
        return vec![unpad(start)];
    };

    let mut points = Vec::new();
    let mut previous = first;
    let mut current = start;

    loop {
        points.push(unpad(current));

        // counter-clockwise search starting after the previous pixel
        let back_dir = direction_index(previous.x - current.x, previous.y - current.y);
        let mut east_examined = false;
        let mut next = previous;
        for k in 1..=8 {
            let dir = (back_dir + 8 - k) % 8;
            let candidate = step(current, dir);
            if labels[at(candidate)] != 0 {
                next = candidate;
                break;
            }
            if dir == 0 {
                east_examined = true;
            }
        }

        let idx = at(current);
        if east_examined {
            labels[idx] = -nbd;
        } else if labels[idx] == 1 {
            labels[idx] = nbd;
        }

        if next == start && current == first {
            break;
        }
        previous = current;
        current = next;
    }

    points
}

// Builds sibling and child links from parent links, keeping list order
// within every level.
fn link_hierarchy(parents: &[Option<usize>]) -> Vec<HierarchyEntry> {
    let mut hierarchy = vec![HierarchyEntry::default(); parents.len()];
    let mut last_top: Option<usize> = None;
    let mut last_child: Vec<Option<usize>> = vec![None; parents.len()];

    for (i, parent) in parents.iter().enumerate() {
        hierarchy[i].parent = *parent;

        let previous = match parent {
            Some(p) => {
                let previous = last_child[*p];
                if previous.is_none() {
                    hierarchy[*p].first_child = Some(i);
                }
                last_child[*p] = Some(i);
                previous
            }
            None => last_top.replace(i),
        };

        if let Some(previous) = previous {
            hierarchy[previous].next = Some(i);
            hierarchy[i].previous = Some(previous);
        }
    }

    hierarchy
}

/// Compress a closed contour by dropping the points in the middle of
/// horizontal, vertical or diagonal runs.
///
/// Consecutive points must be 8-neighbors, as produced by the border following.
pub fn chain_approx_simple(contour: &[Point]) -> Vec<Point> {
    let n = contour.len();
    if n < 3 {
        return contour.to_vec();
    }

    let delta = |a: Point, b: Point| (b.x - a.x, b.y - a.y);

    let simplified = (0..n)
        .filter(|&i| {
            let prev = contour[(i + n - 1) % n];
            let curr = contour[i];
            let next = contour[(i + 1) % n];
            delta(prev, curr) != delta(curr, next)
        })
        .map(|i| contour[i])
        .collect::<Vec<_>>();

    if simplified.is_empty() {
        return vec![contour[0]];
    }

    simplified
}
