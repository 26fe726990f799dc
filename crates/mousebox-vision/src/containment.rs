//! Full-containment test between the configured region and contour bounds.

use mousebox_types::{BoundingBox, Region};

use crate::contour::Contour;

/// True iff `bounds` lies entirely inside `region`: the intersection of the
/// two rectangles must be `bounds` itself. Partial overlap never counts.
pub fn is_entered(region: Region, bounds: BoundingBox) -> bool {
    region.contains_box(bounds)
}

/// First contour whose bounding box is fully contained in `region`, if any.
/// Evaluation order across contours is irrelevant: any single fully contained
/// box is sufficient.
pub fn first_entered<'a>(region: Region, contours: &'a [Contour]) -> Option<&'a Contour> {
    contours
        .iter()
        .find(|contour| is_entered(region, contour.bounds))
}
