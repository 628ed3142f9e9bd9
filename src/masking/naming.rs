//! Export artifact naming

use std::path::Path;

/// Strip directories and the final extension from `file_name`
pub fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document")
        .to_string()
}

/// `{stem}_masked.pdf`
pub fn masked_pdf_name(source: &str) -> String {
    format!("{}_masked.pdf", file_stem(source))
}

/// `{stem}_masked.png`, or `{stem}_masked_page{N}.png` for paginated sources
pub fn masked_png_name(source: &str, page_number: u32, page_count: u32) -> String {
    if page_count > 1 {
        format!("{}_masked_page{}.png", file_stem(source), page_number)
    } else {
        format!("{}_masked.png", file_stem(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(masked_pdf_name("contract.v2.pdf"), "contract.v2_masked.pdf");
        assert_eq!(masked_png_name("scan.tiff", 1, 1), "scan_masked.png");
        assert_eq!(masked_png_name("form.pdf", 3, 4), "form_masked_page3.png");
        assert_eq!(masked_pdf_name("dir/nested/form.pdf"), "form_masked.pdf");
        assert_eq!(masked_pdf_name(""), "document_masked.pdf");
    }
}
