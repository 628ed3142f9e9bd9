//! Permanent redaction of exported artifacts
//!
//! Raster exports paint opaque black over the full-resolution page bitmap.
//! PDF exports mark each rect with a `/Redact` annotation plus an opaque
//! fill, then let MuPDF apply the redactions: text and image pixels under a
//! rect are removed from the page, not just covered.

use std::collections::BTreeMap;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use mupdf::pdf::{PdfDocument, PdfPage, PdfWriteOptions};
use serde::Serialize;

use crate::geometry::{pdf_space, PdfPageBox, Rect, Size};
use crate::raster::{encode_png, RenderedPage};
use crate::restrictions::{Restriction, RestrictionKind};

use super::error::{BakeError, BakeResult};
use super::naming::{masked_pdf_name, masked_png_name};
use super::overlay::{fill_black, restriction_to_natural};

/// US Letter, used when a page has no MediaBox anywhere in its tree
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// A redacted export
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BakedArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    #[serde(skip)]
    pub data: Vec<u8>,
    /// Rectangles drawn
    pub applied: usize,
    /// Restrictions that could not be drawn
    pub skipped: usize,
}

/// Bakes restrictions into PNG and PDF exports
#[derive(Debug, Clone, Copy)]
pub struct MaskBaker {
    render_scale: f64,
}

impl MaskBaker {
    /// `render_scale` is the scale area restrictions were captured at
    pub fn new(render_scale: f64) -> Self {
        Self { render_scale }
    }

    /// Bake a rendered page into a PNG on the blocking pool
    pub async fn bake_png(
        &self,
        source_name: &str,
        page: RenderedPage,
        page_count: u32,
        restrictions: Vec<Restriction>,
        template: Option<Size>,
    ) -> BakeResult<BakedArtifact> {
        let baker = *self;
        let source_name = source_name.to_string();
        tokio::task::spawn_blocking(move || {
            baker.bake_png_blocking(&source_name, &page, page_count, &restrictions, template)
        })
        .await
        .map_err(|e| BakeError::Task(format!("Task join error: {}", e)))?
    }

    /// Bake PDF bytes on the blocking pool
    pub async fn bake_pdf(
        &self,
        source_name: &str,
        pdf: std::sync::Arc<Vec<u8>>,
        restrictions: Vec<Restriction>,
        template: Option<Size>,
    ) -> BakeResult<BakedArtifact> {
        let baker = *self;
        let source_name = source_name.to_string();
        tokio::task::spawn_blocking(move || {
            baker.bake_pdf_blocking(&source_name, &pdf, &restrictions, template)
        })
        .await
        .map_err(|e| BakeError::Task(format!("Task join error: {}", e)))?
    }

    pub fn bake_png_blocking(
        &self,
        source_name: &str,
        page: &RenderedPage,
        page_count: u32,
        restrictions: &[Restriction],
        template: Option<Size>,
    ) -> BakeResult<BakedArtifact> {
        let mut bitmap = (*page.bitmap).clone();
        let mut applied = 0;
        let mut skipped = 0;

        for restriction in restrictions {
            let natural =
                restriction_to_natural(restriction, page.natural, template, self.render_scale);
            let pixels = natural.scale(page.raster_scale, page.raster_scale);
            if pixels.is_degenerate() || !fill_black(&mut bitmap, &pixels) {
                tracing::warn!(
                    "Skipping restriction {} outside page {} bitmap: {:?}",
                    restriction.label(),
                    page.page_number,
                    pixels
                );
                skipped += 1;
                continue;
            }
            applied += 1;
        }

        if applied == 0 {
            return Err(BakeError::NoMaskableRestrictions);
        }

        let data = encode_png(&bitmap).map_err(|e| BakeError::Encode(e.to_string()))?;
        tracing::info!(
            "Baked {} masks into page {} of {} ({} skipped)",
            applied,
            page.page_number,
            source_name,
            skipped
        );

        Ok(BakedArtifact {
            file_name: masked_png_name(source_name, page.page_number, page_count),
            mime_type: "image/png",
            data,
            applied,
            skipped,
        })
    }

    pub fn bake_pdf_blocking(
        &self,
        source_name: &str,
        pdf: &[u8],
        restrictions: &[Restriction],
        template: Option<Size>,
    ) -> BakeResult<BakedArtifact> {
        let mut doc = Document::load_mem(pdf)?;
        let (rects_by_page, skipped) = self.plan_pdf_masks(&doc, restrictions, template);

        let applied: usize = rects_by_page.values().map(Vec::len).sum();
        if applied == 0 {
            return Err(BakeError::NoMaskableRestrictions);
        }

        let pages = doc.get_pages();
        for (page_number, rects) in &rects_by_page {
            let Some(&page_id) = pages.get(page_number) else {
                continue;
            };
            add_redact_annotations(&mut doc, page_id, rects)?;
            append_mask_stream(&mut doc, page_id, rects)?;
        }

        let mut marked = Vec::new();
        doc.save_to(&mut marked)
            .map_err(|e| BakeError::Encode(format!("Failed to write PDF: {}", e)))?;
        let data = apply_redactions(&marked, rects_by_page.keys().copied())?;

        tracing::info!(
            "Baked {} masks across {} pages of {} ({} skipped)",
            applied,
            rects_by_page.len(),
            source_name,
            skipped
        );

        Ok(BakedArtifact {
            file_name: masked_pdf_name(source_name),
            mime_type: "application/pdf",
            data,
            applied,
            skipped,
        })
    }

    /// PDF user-space rects per page number, clipped to the visible page
    /// box, and the count of restrictions that produced nothing to draw
    fn plan_pdf_masks(
        &self,
        doc: &Document,
        restrictions: &[Restriction],
        template: Option<Size>,
    ) -> (BTreeMap<u32, Vec<Rect>>, usize) {
        let pages = doc.get_pages();
        let mut rects_by_page: BTreeMap<u32, Vec<Rect>> = BTreeMap::new();
        let mut skipped = 0;

        for restriction in restrictions {
            let Some(&page_id) = pages.get(&restriction.page_number) else {
                tracing::warn!(
                    "Skipping restriction {}: page {} not in document ({} pages)",
                    restriction.label(),
                    restriction.page_number,
                    pages.len()
                );
                skipped += 1;
                continue;
            };

            let page_box = page_box(doc, page_id);
            let rect = pdf_space(
                restriction.rect,
                page_box,
                self.render_scale,
                restriction.kind == RestrictionKind::FieldMask,
                template,
            );
            let Some(clipped) = rect.clamp_to(&page_box.bounds()) else {
                tracing::warn!(
                    "Skipping restriction {} outside page {}: {:?}",
                    restriction.label(),
                    restriction.page_number,
                    restriction.rect
                );
                skipped += 1;
                continue;
            };
            rects_by_page.entry(restriction.page_number).or_default().push(clipped);
        }

        (rects_by_page, skipped)
    }
}

fn number(doc: &Document, object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        Object::Reference(id) => doc.get_object(*id).ok().and_then(|o| number(doc, o)),
        _ => None,
    }
}

/// Page attribute, inherited through `Parent` when absent
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    // Bounded walk; malformed trees can loop
    for _ in 0..32 {
        let id = current?;
        let dict = doc.get_object(id).and_then(Object::as_dict).ok()?;
        if let Ok(object) = dict.get(key) {
            return match object {
                Object::Reference(r) => doc.get_object(*r).ok(),
                other => Some(other),
            };
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// `[llx, lly, urx, ury]` of an inherited box attribute
fn page_rect(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<[f64; 4]> {
    let values = inherited(doc, page_id, key)?.as_array().ok()?;
    let numbers: Vec<f64> = values.iter().filter_map(|v| number(doc, v)).collect();
    match numbers[..] {
        [llx, lly, urx, ury] => Some([llx, lly, urx, ury]),
        _ => None,
    }
}

/// The box a renderer shows: CropBox clipped to the MediaBox, with `/Rotate`
fn page_box(doc: &Document, page_id: ObjectId) -> PdfPageBox {
    let media = page_rect(doc, page_id, b"MediaBox")
        .map(PdfPageBox::from_media_box)
        .unwrap_or_else(|| {
            tracing::warn!("Page {:?} has no MediaBox, assuming US Letter", page_id);
            PdfPageBox::from_media_box(DEFAULT_MEDIA_BOX)
        });

    let visible = page_rect(doc, page_id, b"CropBox")
        .map(PdfPageBox::from_media_box)
        .and_then(|crop| crop.bounds().clamp_to(&media.bounds()))
        .map(|r| PdfPageBox::from_media_box([r.x, r.y, r.right(), r.bottom()]))
        .unwrap_or(media);

    let rotation = inherited(doc, page_id, b"Rotate")
        .and_then(|o| number(doc, o))
        .unwrap_or(0.0);
    visible.with_rotation(rotation as i64)
}

/// Add one `/Redact` annotation per rect to the page's `Annots`
fn add_redact_annotations(doc: &mut Document, page_id: ObjectId, rects: &[Rect]) -> BakeResult<()> {
    let mut annots = {
        let page = doc.get_object(page_id)?.as_dict()?;
        match page.get(b"Annots") {
            Ok(Object::Reference(id)) => doc
                .get_object(*id)
                .and_then(Object::as_array)
                .cloned()
                .unwrap_or_default(),
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    };

    for rect in rects {
        let quad: Vec<Object> = [rect.x, rect.y, rect.right(), rect.bottom()]
            .iter()
            .map(|v| Object::Real(*v as f32))
            .collect();
        let id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Redact",
            "Rect" => quad,
            "IC" => vec![0.into(), 0.into(), 0.into()],
            "P" => Object::Reference(page_id),
        });
        annots.push(Object::Reference(id));
    }

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Annots", Object::Array(annots));
    Ok(())
}

/// Apply every `/Redact` annotation on the given 1-based pages with MuPDF
/// and write the result without unreferenced objects
fn apply_redactions(pdf: &[u8], page_numbers: impl Iterator<Item = u32>) -> BakeResult<Vec<u8>> {
    let document = PdfDocument::from_bytes(pdf)?;
    for page_number in page_numbers {
        let page = document.load_page(page_number as i32 - 1)?;
        let mut page = PdfPage::try_from(page)?;
        if !page.redact()? {
            tracing::warn!("Page {} had no redactions to apply", page_number);
        }
    }

    let mut options = PdfWriteOptions::default();
    options.set_garbage_level(3);
    let mut data = Vec::new();
    document.write_to_with_options(&mut data, options)?;
    Ok(data)
}

/// Content stream drawing opaque black rectangles in PDF user space
fn mask_content(rects: &[Rect]) -> Vec<u8> {
    let mut ops = String::from("\nQ\nq 0 g 0 G 0 w\n");
    for rect in rects {
        ops.push_str(&format!(
            "{:.4} {:.4} {:.4} {:.4} re f\n",
            rect.x, rect.y, rect.width, rect.height
        ));
    }
    ops.push_str("Q\n");
    ops.into_bytes()
}

/// Wrap the page's existing content in `q … Q` and append the mask stream
fn append_mask_stream(doc: &mut Document, page_id: ObjectId, rects: &[Rect]) -> BakeResult<()> {
    let existing = {
        let page = doc.get_object(page_id)?.as_dict()?;
        match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                // Contents may point at an array of streams
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    };

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mask_id = doc.add_object(Stream::new(Dictionary::new(), mask_content(rects)));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(mask_id));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}
