use lopdf::content::Content;
use lopdf::{Document as LoDocument, Object as LoObject};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfInspectErrorCode {
    PdfParseFailed,
    PdfEncryptedUnsupported,
    PdfContentUnreadable,
}

impl PdfInspectErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfInspectErrorCode::PdfParseFailed => "PDF_PARSE_FAILED",
            PdfInspectErrorCode::PdfEncryptedUnsupported => "PDF_ENCRYPTED_UNSUPPORTED",
            PdfInspectErrorCode::PdfContentUnreadable => "PDF_CONTENT_UNREADABLE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectError {
    pub code: PdfInspectErrorCode,
    pub message: String,
}

impl PdfInspectError {
    fn new(code: PdfInspectErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PdfInspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for PdfInspectError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectWarning {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
    /// Targets of URI link annotations, page order.
    pub link_uris: Vec<String>,
    pub warnings: Vec<PdfInspectWarning>,
}

fn load(bytes: &[u8]) -> Result<LoDocument, PdfInspectError> {
    LoDocument::load_mem(bytes)
        .map_err(|err| PdfInspectError::new(PdfInspectErrorCode::PdfParseFailed, err.to_string()))
}

fn link_uris(pdf: &LoDocument, page_id: lopdf::ObjectId) -> Vec<String> {
    let Ok(page) = pdf.get_dictionary(page_id) else {
        return Vec::new();
    };
    let Ok(annots) = page.get(b"Annots").and_then(LoObject::as_array) else {
        return Vec::new();
    };
    annots
        .iter()
        .filter_map(|annot| {
            let (_, annot) = pdf.dereference(annot).ok()?;
            let action = annot.as_dict().ok()?.get(b"A").ok()?;
            let (_, action) = pdf.dereference(action).ok()?;
            let uri = action.as_dict().ok()?.get(b"URI").ok()?.as_str().ok()?;
            Some(String::from_utf8_lossy(uri).into_owned())
        })
        .collect()
}

pub fn inspect_pdf_bytes(bytes: &[u8]) -> Result<PdfInspectReport, PdfInspectError> {
    let pdf = load(bytes)?;
    let pages = pdf.get_pages();
    let mut warnings = Vec::new();
    if pages.is_empty() {
        warnings.push(PdfInspectWarning {
            code: "PDF_EMPTY_OR_NO_PAGES".to_string(),
            message: "pdf has no pages".to_string(),
        });
    }
    let link_uris = pages
        .values()
        .flat_map(|page_id| link_uris(&pdf, *page_id))
        .collect();

    Ok(PdfInspectReport {
        pdf_version: pdf.version.clone(),
        page_count: pages.len(),
        encrypted: pdf.is_encrypted(),
        file_size_bytes: bytes.len(),
        link_uris,
        warnings,
    })
}

/// Strings shown with `Tj` on each page, in drawing order. Bytes are read as
/// Latin-1, which matches WinAnsi for everything but 0x80..=0x9F.
pub fn page_text_runs(bytes: &[u8]) -> Result<Vec<Vec<String>>, PdfInspectError> {
    let pdf = load(bytes)?;
    if pdf.is_encrypted() {
        return Err(PdfInspectError::new(
            PdfInspectErrorCode::PdfEncryptedUnsupported,
            "encrypted pdf content cannot be read",
        ));
    }
    let mut pages = Vec::new();
    for page_id in pdf.get_pages().values() {
        let content = pdf.get_page_content(*page_id).map_err(|err| {
            PdfInspectError::new(PdfInspectErrorCode::PdfContentUnreadable, err.to_string())
        })?;
        let content = Content::decode(&content).map_err(|err| {
            PdfInspectError::new(PdfInspectErrorCode::PdfContentUnreadable, err.to_string())
        })?;
        let runs = content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(LoObject::String(raw, _)) => {
                    Some(raw.iter().map(|b| *b as char).collect::<String>())
                }
                _ => None,
            })
            .collect();
        pages.push(runs);
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Stream as LoStream, dictionary};

    fn make_single_page_pdf_bytes(text: &str) -> Vec<u8> {
        let mut doc = LoDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = format!("BT /F1 18 Tf 72 720 Td ({}) Tj ET", text).into_bytes();
        let content_id = doc.add_object(LoStream::new(dictionary! {}, content));
        let link_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => vec![0.into(), 0.into(), 10.into(), 10.into()],
            "A" => dictionary! {
                "S" => "URI",
                "URI" => LoObject::string_literal("https://cdn.example/front.jpg"),
            },
        });
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Annots" => vec![link_id.into()],
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, LoObject::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("save");
        out
    }

    #[test]
    fn inspect_pdf_bytes_reads_version_pages_and_links() {
        let bytes = make_single_page_pdf_bytes("HELLO");
        let report = inspect_pdf_bytes(&bytes).expect("inspect");
        assert_eq!(report.page_count, 1);
        assert!(!report.encrypted);
        assert_eq!(report.file_size_bytes, bytes.len());
        assert!(!report.pdf_version.is_empty());
        assert_eq!(report.link_uris, vec!["https://cdn.example/front.jpg"]);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn inspect_pdf_bytes_rejects_malformed_data() {
        let err = inspect_pdf_bytes(b"not a pdf").expect_err("invalid");
        assert_eq!(err.code, PdfInspectErrorCode::PdfParseFailed);
    }

    #[test]
    fn page_text_runs_reads_compressed_content() {
        let bytes = make_single_page_pdf_bytes("RS. 40,000/-");
        let pages = page_text_runs(&bytes).expect("text");
        assert_eq!(pages, vec![vec!["RS. 40,000/-".to_string()]]);
    }
}
