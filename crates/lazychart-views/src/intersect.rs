//! Viewport intersection math for chart regions

use egui::Rect;

/// Fraction of `region` covered by `viewport` after expanding the viewport
/// by `margin` points on every side.
///
/// The margin widens the effective trigger area so loading can begin
/// slightly before a region is literally on screen. Returns 0 for regions
/// with no positive overlap (including zero-area regions).
pub fn intersection_ratio(region: Rect, viewport: Rect, margin: f32) -> f32 {
    let region_area = region.width() * region.height();
    if region_area <= 0.0 {
        return 0.0;
    }
    let overlap = viewport.expand(margin).intersect(region);
    if overlap.width() <= 0.0 || overlap.height() <= 0.0 {
        return 0.0;
    }
    (overlap.width() * overlap.height() / region_area).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn viewport() -> Rect {
        Rect::from_min_max(pos2(0.0, 0.0), pos2(800.0, 600.0))
    }

    #[test]
    fn region_inside_viewport_is_fully_covered() {
        let region = Rect::from_min_max(pos2(100.0, 100.0), pos2(300.0, 200.0));
        assert_eq!(intersection_ratio(region, viewport(), 0.0), 1.0);
    }

    #[test]
    fn region_far_below_viewport_has_no_overlap() {
        let region = Rect::from_min_max(pos2(0.0, 2000.0), pos2(800.0, 2300.0));
        assert_eq!(intersection_ratio(region, viewport(), 100.0), 0.0);
    }

    #[test]
    fn margin_triggers_before_the_region_is_on_screen() {
        // 300-point-tall region starting 50 points below the viewport edge.
        let region = Rect::from_min_max(pos2(0.0, 650.0), pos2(800.0, 950.0));

        // Not intersecting the literal viewport rectangle.
        assert_eq!(intersection_ratio(region, viewport(), 0.0), 0.0);

        // Within the 100-point margin: 50 of 300 points overlap.
        let ratio = intersection_ratio(region, viewport(), 100.0);
        assert!((ratio - 50.0 / 300.0).abs() < 1e-6);
        assert!(ratio >= 0.1);
    }

    #[test]
    fn partial_overlap_reports_the_covered_fraction() {
        // Bottom half of the region hangs below the viewport.
        let region = Rect::from_min_max(pos2(0.0, 500.0), pos2(800.0, 700.0));
        let ratio = intersection_ratio(region, viewport(), 0.0);
        assert!((ratio - 0.5).abs() < 1e-6);
    }

    #[test]
    fn zero_area_region_never_intersects() {
        let region = Rect::from_min_max(pos2(100.0, 100.0), pos2(100.0, 100.0));
        assert_eq!(intersection_ratio(region, viewport(), 100.0), 0.0);
    }
}
