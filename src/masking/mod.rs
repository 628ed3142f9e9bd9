//! Restriction masking: live overlays and baked exports

mod baker;
mod error;
mod naming;
mod overlay;

pub use baker::{BakedArtifact, MaskBaker};
pub use error::{BakeError, BakeResult};
pub use naming::{file_stem, masked_pdf_name, masked_png_name};
pub use overlay::{composite_overlays, overlay_rects, restriction_to_natural, OverlayRect};
