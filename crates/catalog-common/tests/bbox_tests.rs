//! Tests for BoundingBox operations.

use catalog_common::bbox::BoundingBox;

// ============================================================================
// Constructor tests
// ============================================================================

#[test]
fn test_bbox_new() {
    let bbox = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
    assert_eq!(bbox.min_x, -180.0);
    assert_eq!(bbox.min_y, -90.0);
    assert_eq!(bbox.max_x, 180.0);
    assert_eq!(bbox.max_y, 90.0);
}

#[test]
fn test_bbox_from_array_roundtrip() {
    let bbox = BoundingBox::from([-82.5, 37.0, -80.0, 39.25]);
    assert_eq!(bbox.to_array(), [-82.5, 37.0, -80.0, 39.25]);
}

#[test]
fn test_bbox_from_ras_extents_reorders() {
    // RAS stores [min_x, max_x, min_y, max_y]
    let bbox = BoundingBox::from_ras_extents([1_200_000.0, 1_350_000.0, 1_900_000.0, 2_050_000.0]);
    assert_eq!(bbox.min_x, 1_200_000.0);
    assert_eq!(bbox.max_x, 1_350_000.0);
    assert_eq!(bbox.min_y, 1_900_000.0);
    assert_eq!(bbox.max_y, 2_050_000.0);
}

// ============================================================================
// from_points tests
// ============================================================================

#[test]
fn test_bbox_from_points() {
    let bbox = BoundingBox::from_points(vec![[1.0, 5.0], [-2.0, 3.0], [4.0, -1.0]]).unwrap();
    assert_eq!(bbox, BoundingBox::new(-2.0, -1.0, 4.0, 5.0));
}

#[test]
fn test_bbox_from_single_point_is_degenerate() {
    let bbox = BoundingBox::from_points(vec![[3.0, 3.0]]).unwrap();
    assert_eq!(bbox.width(), 0.0);
    assert_eq!(bbox.height(), 0.0);
}

#[test]
fn test_bbox_from_no_points() {
    assert!(BoundingBox::from_points(Vec::new()).is_none());
}

// ============================================================================
// Dimension tests (width/height)
// ============================================================================

#[test]
fn test_bbox_width() {
    let bbox = BoundingBox::new(10.0, 0.0, 30.0, 10.0);
    assert_eq!(bbox.width(), 20.0);
}

#[test]
fn test_bbox_height() {
    let bbox = BoundingBox::new(0.0, 5.0, 10.0, 25.0);
    assert_eq!(bbox.height(), 20.0);
}

#[test]
fn test_bbox_width_negative_coords() {
    let bbox = BoundingBox::new(-100.0, 0.0, -50.0, 10.0);
    assert_eq!(bbox.width(), 50.0);
}

// ============================================================================
// Ring tests
// ============================================================================

#[test]
fn test_bbox_ring_is_closed_and_ordered() {
    let ring = BoundingBox::new(0.0, 0.0, 2.0, 1.0).ring();
    assert_eq!(
        ring,
        vec![[0.0, 0.0], [0.0, 1.0], [2.0, 1.0], [2.0, 0.0], [0.0, 0.0]]
    );
    assert_eq!(ring.first(), ring.last());
}

// ============================================================================
// Contains point tests
// ============================================================================

#[test]
fn test_bbox_contains_point_on_edge() {
    let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    assert!(bbox.contains_point(0.0, 5.0));
    assert!(bbox.contains_point(10.0, 5.0));
    assert!(bbox.contains_point(5.0, 0.0));
    assert!(bbox.contains_point(5.0, 10.0));
}

#[test]
fn test_bbox_contains_point_outside() {
    let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    assert!(!bbox.contains_point(-1.0, 5.0));
    assert!(!bbox.contains_point(11.0, 5.0));
}

// ============================================================================
// Edge cases
// ============================================================================

#[test]
fn test_bbox_non_finite() {
    assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_finite());
    assert!(!BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).is_finite());
    assert!(!BoundingBox::new(0.0, 0.0, f64::INFINITY, 1.0).is_finite());
}

#[test]
fn test_bbox_inverted_does_not_panic() {
    let bbox = BoundingBox::new(10.0, 10.0, 0.0, 0.0);
    assert_eq!(bbox.width(), -10.0);
    assert_eq!(bbox.height(), -10.0);
}
