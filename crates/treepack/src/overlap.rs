//! Overlap measurement between transformed pieces.
//!
//! The tree outline is non-convex, so separating-axis tests are not enough to
//! measure *how much* two pieces overlap. Intersections go through the
//! `i_overlay` boolean engine; pairs with disjoint bounding boxes are skipped
//! and contribute exactly 0.
//!
//! Cost is O(N²) pairwise with a cheap box pre-filter.

use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::Vector2;

use crate::configuration::Configuration;
use crate::piece::Polygon;

/// Intersection areas at or below this count as touching, not overlapping.
pub const AREA_EPS: f64 = 1e-12;

/// Unsigned shoelace area of a closed ring.
pub fn polygon_area(points: &[Vector2<f64>]) -> f64 {
    signed_area(points.iter().map(|p| [p.x, p.y])).abs()
}

fn signed_area<I: IntoIterator<Item = [f64; 2]>>(ring: I) -> f64 {
    let pts: Vec<[f64; 2]> = ring.into_iter().collect();
    if pts.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..pts.len() {
        let [x0, y0] = pts[i];
        let [x1, y1] = pts[(i + 1) % pts.len()];
        acc += x0 * y1 - x1 * y0;
    }
    0.5 * acc
}

#[inline]
fn as_contour(poly: &Polygon) -> Vec<[f64; 2]> {
    poly.points().iter().map(|p| [p.x, p.y]).collect()
}

/// Area of the geometric intersection of two polygons.
///
/// Each result shape is an outer contour followed by its holes.
pub fn intersection_area(a: &Polygon, b: &Polygon) -> f64 {
    if !a.bounds().intersects(&b.bounds()) {
        return 0.0;
    }
    let subj = as_contour(a);
    let clip = as_contour(b);
    let shapes = subj.overlay(&[clip], OverlayRule::Intersect, FillRule::NonZero);
    let mut area = 0.0;
    for shape in &shapes {
        let mut contours = shape.iter();
        if let Some(outer) = contours.next() {
            area += signed_area(outer.iter().copied()).abs();
        }
        for hole in contours {
            area -= signed_area(hole.iter().copied()).abs();
        }
    }
    if area <= AREA_EPS {
        0.0
    } else {
        area
    }
}

/// Sum of intersection areas over all unordered pairs `i < j`.
pub fn total_overlap(config: &Configuration) -> f64 {
    let pieces = config.pieces();
    let mut total = 0.0;
    for i in 0..pieces.len() {
        for j in (i + 1)..pieces.len() {
            total += intersection_area(pieces[i].polygon(), pieces[j].polygon());
        }
    }
    total
}

/// Overlap of piece `index` with every other piece.
pub fn piece_overlap(config: &Configuration, index: usize) -> f64 {
    let pieces = config.pieces();
    let target = pieces[index].polygon();
    pieces
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != index)
        .map(|(_, p)| intersection_area(target, p.polygon()))
        .sum()
}

/// All overlapping pairs `(i, j, area)` with `i < j`.
pub fn overlapping_pairs(config: &Configuration) -> Vec<(usize, usize, f64)> {
    let pieces = config.pieces();
    let mut out = Vec::new();
    for i in 0..pieces.len() {
        for j in (i + 1)..pieces.len() {
            let area = intersection_area(pieces[i].polygon(), pieces[j].polygon());
            if area > 0.0 {
                out.push((i, j, area));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Placement;
    use crate::shape::BaseShape;
    use std::sync::Arc;

    const TREE_AREA: f64 = 0.245625;

    fn config(placements: &[Placement]) -> Configuration {
        Configuration::from_placements(Arc::new(BaseShape::tree()), placements).unwrap()
    }

    #[test]
    fn identical_copies_overlap_by_their_own_area() {
        let placements = [
            Placement::new(0.0, 0.0, 0.0),
            Placement::new(3.0, -1.0, 37.0),
            Placement::new(-2.0, 4.0, 211.5),
        ];
        let c = config(&placements);
        let mut twin = placements.to_vec();
        twin.extend_from_slice(&placements);
        let doubled = config(&twin);
        let own: f64 = c.pieces().iter().map(|p| p.polygon().area()).sum();
        assert!((own - 3.0 * TREE_AREA).abs() < 1e-9);
        assert!((total_overlap(&doubled) - own).abs() < 1e-6);
        for p in c.pieces() {
            let self_area = intersection_area(p.polygon(), p.polygon());
            assert!((self_area - TREE_AREA).abs() < 1e-6);
        }
    }

    #[test]
    fn disjoint_boxes_have_exactly_zero_overlap() {
        let c = config(&[Placement::new(0.0, 0.0, 0.0), Placement::new(5.0, 5.0, 45.0)]);
        assert_eq!(total_overlap(&c), 0.0);
        assert!(overlapping_pairs(&c).is_empty());
    }

    #[test]
    fn known_non_overlapping_offset() {
        // Side by side with a gap: boxes [-0.35,0.35] and [0.45,1.15].
        let c = config(&[Placement::new(0.0, 0.0, 0.0), Placement::new(0.8, 0.0, 0.0)]);
        assert_eq!(total_overlap(&c), 0.0);
        assert!((c.side() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn shifted_copy_overlaps_partially() {
        // Shift by half the trunk height: only part of the outline is shared.
        let c = config(&[Placement::new(0.0, 0.0, 0.0), Placement::new(0.0, 0.1, 0.0)]);
        let ov = total_overlap(&c);
        assert!(ov > 0.0 && ov < TREE_AREA);
        assert!((piece_overlap(&c, 0) - ov).abs() < 1e-9);
        assert!((piece_overlap(&c, 1) - ov).abs() < 1e-9);
        let pairs = overlapping_pairs(&c);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].0, pairs[0].1), (0, 1));
    }

    #[test]
    fn boxes_overlap_but_shapes_do_not() {
        // Upside-down neighbour tucked beside the top tier; boxes
        // intersect, outlines stay apart.
        let c = config(&[Placement::new(0.0, 0.0, 0.0), Placement::new(0.5, 1.2, 180.0)]);
        let (a, b) = (c.pieces()[0].polygon(), c.pieces()[1].polygon());
        assert!(a.bounds().intersects(&b.bounds()));
        assert_eq!(total_overlap(&c), 0.0);
    }

    #[test]
    fn single_piece_has_no_overlap() {
        let c = config(&[Placement::new(1.0, 1.0, 10.0)]);
        assert_eq!(total_overlap(&c), 0.0);
        assert_eq!(piece_overlap(&c, 0), 0.0);
    }
}
