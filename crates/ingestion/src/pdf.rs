//! PDF text extraction module
//!
//! Extracts text content from uploaded PDF bytes using lopdf, page by page.
//! Pages without a text layer are reported and skipped; scanned documents
//! therefore produce no text rather than an error.

use lumina_common::{AppError, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

/// What happened to a single page during extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PageOutcome {
    Extracted { chars: usize },
    NoText,
    Unreadable { reason: String },
}

/// Per-page extraction report, pages numbered from 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageReport {
    pub page: u32,
    #[serde(flatten)]
    pub outcome: PageOutcome,
}

/// Text of a whole document plus the per-page reports
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub text: String,
    pub pages: Vec<PageReport>,
}

impl Extraction {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages that contributed text
    pub fn extracted_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| matches!(p.outcome, PageOutcome::Extracted { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Extract the text layer of every page, in page order.
///
/// Each page with text contributes its text followed by a newline.
pub fn extract_text_from_pdf(bytes: &[u8]) -> Result<Extraction> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| AppError::DocumentUnreadable {
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut extraction = Extraction::default();

    for &page in pages.keys() {
        let outcome = match doc.extract_text(&[page]) {
            Ok(raw) => {
                let page_text = clean_text(&raw);
                if page_text.trim().is_empty() {
                    info!(page, "Page {}: No text found", page);
                    PageOutcome::NoText
                } else {
                    info!(page, "Page {}: Text extracted", page);
                    extraction.text.push_str(&page_text);
                    extraction.text.push('\n');
                    PageOutcome::Extracted {
                        chars: page_text.chars().count(),
                    }
                }
            }
            Err(e) => {
                warn!(page, error = %e, "Failed to extract text from page, skipping");
                PageOutcome::Unreadable {
                    reason: e.to_string(),
                }
            }
        };
        extraction.pages.push(PageReport { page, outcome });
    }

    debug!(
        text_len = extraction.text.len(),
        extracted_pages = extraction.extracted_pages(),
        "Text extraction complete"
    );

    Ok(extraction)
}

/// Strip extraction artifacts while keeping line structure
fn clean_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace(['\u{FEFF}', '\0'], "")
        .trim_end()
        .to_string()
}

/// Builders for small text-layer PDFs used by tests
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Build a PDF with one page per entry; `None` yields a page with
    /// drawing operations only. Every line of a page is its own text object.
    pub fn pdf_with_pages(pages: &[Option<&str>]) -> lopdf::Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::with_capacity(pages.len());
        for page in pages {
            let operations = match page {
                Some(text) => text_operations(text),
                None => vec![
                    Operation::new("re", vec![72.into(), 600.into(), 200.into(), 100.into()]),
                    Operation::new("S", vec![]),
                ],
            };
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            kids.push(Object::from(page_id));
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
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }

    fn text_operations(text: &str) -> Vec<Operation> {
        let mut operations = Vec::new();
        let mut y: i64 = 760;
        for line in text.lines() {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), y.into()]),
                Operation::new("Tj", vec![Object::string_literal(line)]),
                Operation::new("ET", vec![]),
            ]);
            y -= 16;
        }
        operations
    }
}
