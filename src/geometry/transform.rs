//! Coordinate transformation between template, natural, display and PDF spaces
//!
//! Every function here is pure. Scaling functions are guarded against zero
//! source dimensions: a degenerate source size leaves the rect untouched
//! rather than dividing by zero.

use super::types::{Rect, Size};

/// Default scale used to rasterize PDF pages for both the masking and the OCR
/// preview. Area restrictions are captured in this space.
pub const DEFAULT_RENDER_SCALE: f64 = 1.5;

/// Scale a rect from `from` space into `to` space
fn rescale(rect: Rect, from: Size, to: Size) -> Rect {
    if from.width == 0.0 || from.height == 0.0 {
        return rect;
    }
    rect.scale(to.width / from.width, to.height / from.height)
}

/// Natural (page at scale 1.0) to display space
pub fn to_display(rect: Rect, natural: Size, display: Size) -> Rect {
    rescale(rect, natural, display)
}

/// Display to natural space
pub fn to_natural(rect: Rect, natural: Size, display: Size) -> Rect {
    if natural.width == 0.0 || natural.height == 0.0 {
        return rect;
    }
    rescale(rect, display, natural)
}

/// Re-project a field rect authored against a template image onto `target`
pub fn template_to_target(rect: Rect, template: Size, target: Size) -> Rect {
    rescale(rect, template, target)
}

/// Convert a rect drawn on screen into the render-scale space area
/// restrictions are stored in
pub fn capture_area_mask(rect: Rect, natural: Size, display: Size, render_scale: f64) -> Rect {
    let natural_rect = to_natural(rect, natural, display);
    natural_rect.scale(render_scale, render_scale)
}

/// Stored area restriction back to natural space
pub fn area_mask_to_natural(rect: Rect, render_scale: f64) -> Rect {
    if render_scale == 0.0 || !render_scale.is_finite() {
        return rect;
    }
    rect.scale(1.0 / render_scale, 1.0 / render_scale)
}

/// Visible page box in PDF user space (points, bottom-left origin) plus the
/// page's `/Rotate`, normalized to 0, 90, 180 or 270
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfPageBox {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: u16,
}

impl PdfPageBox {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            width,
            height,
            rotation: 0,
        }
    }

    /// From a `[llx, lly, urx, ury]` page box
    pub fn from_media_box(media_box: [f64; 4]) -> Self {
        let [llx, lly, urx, ury] = media_box;
        Self {
            origin_x: llx.min(urx),
            origin_y: lly.min(ury),
            width: (urx - llx).abs(),
            height: (ury - lly).abs(),
            rotation: 0,
        }
    }

    /// Clockwise rotation in degrees. Values that are not a multiple of 90
    /// are ignored, as PDF viewers do.
    pub fn with_rotation(mut self, degrees: i64) -> Self {
        let normalized = degrees.rem_euclid(360);
        self.rotation = if normalized % 90 == 0 { normalized as u16 } else { 0 };
        self
    }

    /// Unrotated box size
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Page size as displayed, after rotation. This is the natural size a
    /// renderer reports for the page.
    pub fn natural_size(&self) -> Size {
        match self.rotation {
            90 | 270 => Size::new(self.height, self.width),
            _ => self.size(),
        }
    }

    /// The visible box as a rect in PDF user space
    pub fn bounds(&self) -> Rect {
        Rect::new(self.origin_x, self.origin_y, self.width, self.height)
    }

    /// Map a natural-space rect (top-left origin, rotation applied) into PDF
    /// user space. The result's `y` is the rectangle's bottom edge.
    pub fn natural_to_pdf(&self, rect: Rect) -> Rect {
        let (w, h) = (self.width, self.height);
        // Unrotated top-left origin coordinates
        let (u, v, uw, vh) = match self.rotation {
            90 => (rect.y, h - rect.x - rect.width, rect.height, rect.width),
            180 => (w - rect.x - rect.width, h - rect.y - rect.height, rect.width, rect.height),
            270 => (w - rect.y - rect.height, rect.x, rect.height, rect.width),
            _ => (rect.x, rect.y, rect.width, rect.height),
        };
        Rect {
            x: self.origin_x + u,
            y: self.origin_y + h - v - vh,
            width: uw,
            height: vh,
        }
    }
}

/// Convert a stored restriction rect into PDF user space.
///
/// Field masks scale from template space to the page as displayed (identity
/// when no template is known); area masks divide out the render scale they
/// were captured at. The natural rect is then rotated back and flipped into
/// the page box.
pub fn pdf_space(
    rect: Rect,
    page: PdfPageBox,
    render_scale: f64,
    is_field_mask: bool,
    template: Option<Size>,
) -> Rect {
    let natural = if is_field_mask {
        match template {
            Some(t) => template_to_target(rect, t, page.natural_size()),
            None => rect,
        }
    } else {
        area_mask_to_natural(rect, render_scale)
    };
    page.natural_to_pdf(natural)
}
