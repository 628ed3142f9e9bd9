//! Coordinate spaces and rectangle conversions
//!
//! ```text
//!  template space ──template_to_target──┐
//!                                       ▼
//!  render-scale space ──÷ scale──► natural space ◄──to_natural── display space
//!                                       │  └──────to_display─────────►
//!                                       └──pdf_space──► PDF points (y up)
//! ```

mod transform;
mod types;

pub use transform::{
    area_mask_to_natural, capture_area_mask, pdf_space, template_to_target, to_display,
    to_natural, PdfPageBox, DEFAULT_RENDER_SCALE,
};
pub use types::{Point, Rect, Size};
