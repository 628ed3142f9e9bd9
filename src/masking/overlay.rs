//! Live masking overlays in display space

use image::{Rgba, RgbaImage};
use serde::Serialize;

use crate::geometry::{area_mask_to_natural, template_to_target, to_display, Rect, Size};
use crate::raster::RenderedPage;
use crate::restrictions::{Restriction, RestrictionKind};

/// A mask rectangle ready to draw over the displayed page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayRect {
    pub restriction_id: Option<String>,
    pub kind: RestrictionKind,
    pub rect: Rect,
}

/// Map a stored restriction rect into natural page space
pub fn restriction_to_natural(
    restriction: &Restriction,
    natural: Size,
    template: Option<Size>,
    render_scale: f64,
) -> Rect {
    match restriction.kind {
        RestrictionKind::FieldMask => match template {
            Some(template) => template_to_target(restriction.rect, template, natural),
            None => restriction.rect,
        },
        RestrictionKind::AreaMask => area_mask_to_natural(restriction.rect, render_scale),
    }
}

/// Display-space overlays for `restrictions`; degenerate ones are skipped
pub fn overlay_rects(
    restrictions: &[Restriction],
    natural: Size,
    display: Size,
    template: Option<Size>,
    render_scale: f64,
) -> Vec<OverlayRect> {
    restrictions
        .iter()
        .filter_map(|restriction| {
            let natural_rect = restriction_to_natural(restriction, natural, template, render_scale);
            let rect = to_display(natural_rect, natural, display);
            if rect.is_degenerate() {
                tracing::warn!(
                    "Skipping corrupt restriction {} with rect {:?}",
                    restriction.label(),
                    restriction.rect
                );
                return None;
            }
            Some(OverlayRect {
                restriction_id: restriction.id.clone(),
                kind: restriction.kind,
                rect,
            })
        })
        .collect()
}

/// Fill `rect` with opaque black, clamped to the image
pub(crate) fn fill_black(image: &mut RgbaImage, rect: &Rect) -> bool {
    let bounds = Rect::new(0.0, 0.0, image.width() as f64, image.height() as f64);
    let Some(clamped) = rect.clamp_to(&bounds) else {
        return false;
    };

    let x0 = clamped.x.floor() as u32;
    let y0 = clamped.y.floor() as u32;
    let x1 = (clamped.right().ceil() as u32).min(image.width());
    let y1 = (clamped.bottom().ceil() as u32).min(image.height());

    let black = Rgba([0, 0, 0, 255]);
    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x, y, black);
        }
    }
    true
}

/// Paint overlays onto a display-sized copy of the page
pub fn composite_overlays(page: &RenderedPage, overlays: &[OverlayRect]) -> RgbaImage {
    let mut display = page.display_bitmap();
    for overlay in overlays {
        fill_black(&mut display, &overlay.rect);
    }
    display
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restriction(kind: RestrictionKind, rect: Rect) -> Restriction {
        Restriction {
            id: Some("r".into()),
            document_id: "doc".into(),
            kind,
            field: Some("ssn".into()),
            rect,
            page_number: 1,
            subject_role: None,
            subject_user: None,
            reason: "pii".into(),
            created_by: None,
            created_date: None,
        }
    }

    #[test]
    fn test_field_mask_projects_template_to_display() {
        let overlays = overlay_rects(
            &[restriction(RestrictionKind::FieldMask, Rect::new(20.0, 10.0, 40.0, 8.0))],
            Size::new(400.0, 200.0),
            Size::new(400.0, 200.0),
            Some(Size::new(200.0, 100.0)),
            1.5,
        );
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].rect, Rect::new(40.0, 20.0, 80.0, 16.0));
    }

    #[test]
    fn test_area_mask_divides_render_scale() {
        let overlays = overlay_rects(
            &[restriction(RestrictionKind::AreaMask, Rect::new(150.0, 150.0, 150.0, 30.0))],
            Size::new(612.0, 792.0),
            Size::new(306.0, 396.0),
            None,
            1.5,
        );
        assert_eq!(overlays[0].rect, Rect::new(50.0, 50.0, 50.0, 10.0));
    }

    #[test]
    fn test_field_mask_without_template_is_page_space() {
        let overlays = overlay_rects(
            &[restriction(RestrictionKind::FieldMask, Rect::new(10.0, 10.0, 10.0, 10.0))],
            Size::new(100.0, 100.0),
            Size::new(200.0, 200.0),
            None,
            1.5,
        );
        assert_eq!(overlays[0].rect, Rect::new(20.0, 20.0, 20.0, 20.0));
    }

    #[test]
    fn test_degenerate_restrictions_are_skipped() {
        let overlays = overlay_rects(
            &[
                restriction(RestrictionKind::AreaMask, Rect::new(0.0, 0.0, 0.0, 10.0)),
                restriction(RestrictionKind::AreaMask, Rect::new(0.0, 0.0, 15.0, -3.0)),
                restriction(RestrictionKind::AreaMask, Rect::new(0.0, 0.0, 15.0, 15.0)),
            ],
            Size::new(100.0, 100.0),
            Size::new(100.0, 100.0),
            None,
            1.5,
        );
        assert_eq!(overlays.len(), 1);
    }

    #[test]
    fn test_fill_black_clamps() {
        let mut image = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        assert!(fill_black(&mut image, &Rect::new(8.0, 8.0, 5.0, 5.0)));
        assert_eq!(image.get_pixel(9, 9).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(7, 7).0, [255, 255, 255, 255]);
        assert!(!fill_black(&mut image, &Rect::new(20.0, 20.0, 5.0, 5.0)));
    }
}
