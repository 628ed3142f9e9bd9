//! Fixtures shared by unit tests

use std::io::Cursor;

use image::{DynamicImage, Rgba, RgbaImage};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

/// A PDF with one blank page per `(width, height)` entry
pub fn blank_pdf(pages: &[(f64, f64)]) -> Vec<u8> {
    pdf_with_content(pages, b"")
}

/// A PDF whose pages all share `content` as their content stream
pub fn pdf_with_content(pages: &[(f64, f64)], content: &[u8]) -> Vec<u8> {
    pdf_with_resources(pages, content, Dictionary::new())
}

/// A single Letter page drawing `content` with Helvetica bound to `/F1`
pub fn pdf_with_text(content: &[u8]) -> Vec<u8> {
    let helvetica = dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    };
    pdf_with_resources(
        &[(612.0, 792.0)],
        content,
        dictionary! { "Font" => dictionary! { "F1" => helvetica } },
    )
}

/// Copy of `pdf` with `key` set on every page dictionary
pub fn with_page_entry(pdf: &[u8], key: &str, value: Object) -> Vec<u8> {
    let mut doc = Document::load_mem(pdf).unwrap();
    let page_ids: Vec<_> = doc.get_pages().values().copied().collect();
    for page_id in page_ids {
        doc.get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .set(key, value.clone());
    }
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn pdf_with_resources(pages: &[(f64, f64)], content: &[u8], resources: Dictionary) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for (width, height) in pages {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(*width as f32),
                Object::Real(*height as f32),
            ],
            "Contents" => Object::Reference(content_id),
            "Resources" => resources.clone(),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// PNG bytes of a single-colour image
pub fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut buffer = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    buffer
}

/// Restriction store over a private in-memory SQLite database
pub async fn memory_restriction_store() -> crate::restrictions::RestrictionStore {
    use std::sync::Arc;

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    crate::restrictions::initialize_schema(&pool).await.unwrap();
    crate::restrictions::RestrictionStore::new(Arc::new(
        crate::restrictions::SqliteRestrictionBackend::new(pool),
    ))
}

/// Session collaborators backed by in-memory stores and a mock OCR engine
/// that returns `ocr` for every page
pub async fn test_services_with_ocr(
    ocr: crate::ocr::RecognitionResult,
) -> crate::session::SessionServices {
    use std::sync::Arc;

    crate::session::SessionServices {
        documents: Arc::new(crate::storage::InMemoryDocumentStore::new()),
        restrictions: memory_restriction_store().await,
        templates: Arc::new(
            crate::restrictions::StaticTemplateDirectory::default()
                .with_template("form-a", crate::geometry::Size::new(100.0, 50.0)),
        ),
        ocr: crate::ocr::OcrWorker::spawn(Arc::new(crate::ocr::MockProvider::new(ocr))),
        raster: crate::raster::RasterConfig::default(),
    }
}

pub async fn test_services() -> crate::session::SessionServices {
    test_services_with_ocr(crate::ocr::RecognitionResult::default()).await
}
