//! Polygon validity in the simple-features sense.
//!
//! A polygon is valid when every ring is closed, simple and has at least three
//! distinct vertices, when rings only meet at isolated points, when every hole
//! lies inside the exterior and outside every other hole and when those touch
//! points leave the interior in one piece.
//!
//! Segment pairs are found through an R-tree of segment bounding boxes, so
//! polygons with thousands of holes are checked without comparing every ring
//! with every other ring.

use geo::algorithm::coordinate_position::{CoordPos, CoordinatePosition};
use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Line, LineString, Polygon};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{Envelope, RTree, AABB};
use std::collections::{HashMap, HashSet};

/// Why a polygon is invalid, with the location of the first defect found.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum Invalidity {
    /// A coordinate is NaN or infinite.
    #[error("Invalid Coordinate[{x} {y}]")]
    InvalidCoordinate {
        /// Column of the defect.
        x: f64,
        /// Row of the defect.
        y: f64,
    },

    /// A ring has fewer than three distinct vertices.
    #[error("Too few points in geometry component[{x} {y}]")]
    TooFewPoints {
        /// Column of the defect.
        x: f64,
        /// Row of the defect.
        y: f64,
    },

    /// A ring touches or crosses itself.
    #[error("Ring Self-intersection[{x} {y}]")]
    RingSelfIntersection {
        /// Column of the defect.
        x: f64,
        /// Row of the defect.
        y: f64,
    },

    /// Two rings cross or share a segment.
    #[error("Self-intersection[{x} {y}]")]
    SelfIntersection {
        /// Column of the defect.
        x: f64,
        /// Row of the defect.
        y: f64,
    },

    /// A hole has a vertex outside the exterior ring.
    #[error("Hole lies outside shell[{x} {y}]")]
    HoleOutsideShell {
        /// Column of the defect.
        x: f64,
        /// Row of the defect.
        y: f64,
    },

    /// A hole has a vertex inside another hole.
    #[error("Holes are nested[{x} {y}]")]
    NestedHoles {
        /// Column of the defect.
        x: f64,
        /// Row of the defect.
        y: f64,
    },

    /// Rings touch in a cycle that cuts the interior in several parts.
    #[error("Interior is disconnected[{x} {y}]")]
    DisconnectedInterior {
        /// Column of the defect.
        x: f64,
        /// Row of the defect.
        y: f64,
    },
}

/// Whether `polygon` is a valid polygon.
pub fn is_valid(polygon: &Polygon<f64>) -> bool {
    explain_validity(polygon).is_none()
}

/// The first defect making `polygon` invalid, or `None` when it is valid.
///
/// The checks run in a fixed order: coordinates, ring sizes, ring simplicity,
/// ring interactions, hole placement and finally interior connectivity.
///
/// # Example
///
/// ```
/// use geo::polygon;
/// use sldc::validity::{explain_validity, Invalidity};
///
/// let bow_tie = polygon![
///     (x: 0.0, y: 0.0),
///     (x: 2.0, y: 2.0),
///     (x: 2.0, y: 0.0),
///     (x: 0.0, y: 2.0),
/// ];
///
/// let invalidity = explain_validity(&bow_tie);
/// assert_eq!(invalidity, Some(Invalidity::RingSelfIntersection { x: 1.0, y: 1.0 }));
/// assert_eq!(invalidity.unwrap().to_string(), "Ring Self-intersection[1 1]");
/// ```
pub fn explain_validity(polygon: &Polygon<f64>) -> Option<Invalidity> {
    let rings = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .collect::<Vec<_>>();

    for ring in &rings {
        if let Some(c) = ring.coords().find(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Some(Invalidity::InvalidCoordinate { x: c.x, y: c.y });
        }
    }

    let rings = rings.into_iter().map(dedup_ring).collect::<Vec<_>>();

    for ring in &rings {
        if ring.len() < 4 {
            let c = ring.first().copied().unwrap_or_default();
            return Some(Invalidity::TooFewPoints { x: c.x, y: c.y });
        }
    }

    let segments = rings.iter().map(|ring| ring_segments(ring)).collect::<Vec<_>>();
    let pairs = candidate_pairs(&segments);

    for &((ring, i), (other, j)) in &pairs {
        if ring != other {
            continue;
        }
        let n = segments[ring].len();
        let adjacent = j == i + 1 || (i == 0 && j == n - 1);
        match line_intersection(segments[ring][i], segments[ring][j]) {
            // adjacent segments always share a vertex but must not overlap
            Some(LineIntersection::Collinear { intersection }) => {
                let c = intersection.start;
                return Some(Invalidity::RingSelfIntersection { x: c.x, y: c.y });
            }
            Some(LineIntersection::SinglePoint { intersection: c, .. }) if !adjacent => {
                return Some(Invalidity::RingSelfIntersection { x: c.x, y: c.y });
            }
            _ => {}
        }
    }

    let mut touches = Vec::new();
    for &((ring, i), (other, j)) in &pairs {
        if ring == other {
            continue;
        }
        match line_intersection(segments[ring][i], segments[other][j]) {
            Some(LineIntersection::SinglePoint {
                intersection,
                is_proper: false,
            }) => touches.push((ring, other, intersection)),
            Some(LineIntersection::SinglePoint { intersection: c, .. }) => {
                return Some(Invalidity::SelfIntersection { x: c.x, y: c.y });
            }
            Some(LineIntersection::Collinear { intersection }) => {
                let c = intersection.start;
                return Some(Invalidity::SelfIntersection { x: c.x, y: c.y });
            }
            None => {}
        }
    }

    let Some((exterior, holes)) = rings.split_first() else {
        return None;
    };
    let shell = Polygon::new(LineString::new(exterior.clone()), vec![]);
    let shell_bounds = envelope(exterior);
    for hole in holes {
        if let Some(c) = hole.iter().find(|c| {
            !shell_bounds.contains_point(&[c.x, c.y])
                || shell.coordinate_position(*c) == CoordPos::Outside
        }) {
            return Some(Invalidity::HoleOutsideShell { x: c.x, y: c.y });
        }
    }

    // a hole inside another hole has its bounding box inside the other's
    let hole_bounds = RTree::bulk_load(
        holes
            .iter()
            .enumerate()
            .map(|(i, hole)| GeomWithData::new(Rectangle::from_aabb(envelope(hole)), i))
            .collect(),
    );
    for (i, outer) in holes.iter().enumerate() {
        let mut inner_holes = hole_bounds
            .locate_in_envelope(&envelope(outer))
            .map(|candidate| candidate.data)
            .filter(|&j| j != i)
            .collect::<Vec<_>>();
        if inner_holes.is_empty() {
            continue;
        }
        inner_holes.sort_unstable();

        let outer = Polygon::new(LineString::new(outer.clone()), vec![]);
        for j in inner_holes {
            if let Some(c) = holes[j]
                .iter()
                .find(|c| outer.coordinate_position(*c) == CoordPos::Inside)
            {
                return Some(Invalidity::NestedHoles { x: c.x, y: c.y });
            }
        }
    }

    if let Some(c) = touch_cycle(rings.len(), &touches) {
        return Some(Invalidity::DisconnectedInterior { x: c.x, y: c.y });
    }

    None
}

// Closed ring without repeated consecutive coordinates.
fn dedup_ring(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let mut coords = ring.0.clone();
    coords.dedup();
    if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
        if first != last {
            coords.push(first);
        }
    }
    coords
}

fn ring_segments(ring: &[Coord<f64>]) -> Vec<Line<f64>> {
    ring.windows(2).map(|w| Line::new(w[0], w[1])).collect()
}

fn envelope(coords: &[Coord<f64>]) -> AABB<[f64; 2]> {
    let points = coords.iter().map(|c| [c.x, c.y]).collect::<Vec<_>>();
    AABB::from_points(&points)
}

/// Pairs of segments whose bounding boxes meet, keyed by `(ring, segment)`.
///
/// Every pair appears once, smaller key first, in lexicographic order.
fn candidate_pairs(segments: &[Vec<Line<f64>>]) -> Vec<(SegmentKey, SegmentKey)> {
    let bounds = |line: &Line<f64>| {
        AABB::from_corners([line.start.x, line.start.y], [line.end.x, line.end.y])
    };

    let tree = RTree::bulk_load(
        segments
            .iter()
            .enumerate()
            .flat_map(|(ring, lines)| {
                lines
                    .iter()
                    .enumerate()
                    .map(move |(i, line)| GeomWithData::new(Rectangle::from_aabb(bounds(line)), (ring, i)))
            })
            .collect(),
    );

    let mut pairs = Vec::new();
    for (ring, lines) in segments.iter().enumerate() {
        for (i, line) in lines.iter().enumerate() {
            let key = (ring, i);
            let mut others = tree
                .locate_in_envelope_intersecting(&bounds(line))
                .map(|candidate| candidate.data)
                .filter(|&other| other > key)
                .collect::<Vec<_>>();
            others.sort_unstable();
            pairs.extend(others.into_iter().map(|other| (key, other)));
        }
    }
    pairs
}

type SegmentKey = (usize, usize);

/// The first touch point closing a cycle of rings, if any.
///
/// Rings and touch points form a graph where a ring is linked to every point
/// it touches. The interior is connected as long as this graph is a forest.
fn touch_cycle(num_rings: usize, touches: &[(usize, usize, Coord<f64>)]) -> Option<Coord<f64>> {
    let mut points = HashMap::new();
    let mut links = HashSet::new();
    let mut sets = DisjointSets::new(num_rings);

    for &(a, b, c) in touches {
        // -0.0 and 0.0 are the same point
        let point_key = ((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits());
        let point = *points.entry(point_key).or_insert_with(|| sets.push());

        for ring in [a, b] {
            if !links.insert((ring, point)) {
                continue;
            }
            if !sets.union(ring, point) {
                return Some(c);
            }
        }
    }
    None
}

struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn push(&mut self) -> usize {
        self.parent.push(self.parent.len());
        self.parent.len() - 1
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    // false when both were already in the same set
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (a, b) = (self.find(a), self.find(b));
        if a == b {
            return false;
        }
        self.parent[b] = a;
        true
    }
}
