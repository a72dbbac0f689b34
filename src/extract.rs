//! Text extraction for uploaded documents.
//!
//! Uploads arrive as bytes plus a filename; this module maps the extension
//! to a document type and returns plain UTF-8 text. PDF goes through
//! `pdf-extract`, DOCX through `zip` + `quick-xml`, and plain text/markdown
//! passes through as-is. Extraction never panics: a malformed file returns
//! an error and the upload pipeline skips it.

use std::io::Read;

/// Maximum decompressed bytes read from a DOCX ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Document types accepted by the upload pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocType {
    Pdf,
    Docx,
    Text,
}

impl DocType {
    /// Map a filename to its document type, by extension (case-insensitive).
    pub fn from_filename(name: &str) -> Option<DocType> {
        let lower = name.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(DocType::Pdf)
        } else if lower.ends_with(".docx") {
            Some(DocType::Docx)
        } else if lower.ends_with(".txt") || lower.ends_with(".md") {
            Some(DocType::Text)
        } else {
            None
        }
    }

    /// Label stored in registry metadata and returned by the sources API.
    pub fn label(&self) -> &'static str {
        match self {
            DocType::Pdf => "pdf",
            DocType::Docx => "docx",
            DocType::Text => "text",
        }
    }
}

/// Extraction error: callers log and skip the offending file.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedFile(String),
    Pdf(String),
    Docx(String),
    Encoding(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedFile(name) => write!(f, "unsupported file: {}", name),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Docx(e) => write!(f, "DOCX extraction failed: {}", e),
            ExtractError::Encoding(e) => write!(f, "text decoding failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract plain text from an uploaded file's bytes.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    match DocType::from_filename(file_name) {
        Some(DocType::Pdf) => extract_pdf(bytes),
        Some(DocType::Docx) => extract_docx(bytes),
        Some(DocType::Text) => String::from_utf8(bytes.to_vec())
            .map_err(|e| ExtractError::Encoding(e.to_string())),
        None => Err(ExtractError::UnsupportedFile(file_name.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map(|t| t.trim().to_string())
        .map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut doc_xml = Vec::new();
    let mut found = false;
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| ExtractError::Docx(e.to_string()))?;
        if entry.name() == "word/document.xml" {
            entry
                .take(MAX_XML_ENTRY_BYTES)
                .read_to_end(&mut doc_xml)
                .map_err(|e| ExtractError::Docx(e.to_string()))?;
            if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
                return Err(ExtractError::Docx(
                    "word/document.xml exceeds size limit".to_string(),
                ));
            }
            found = true;
            break;
        }
    }
    if !found {
        return Err(ExtractError::Docx("word/document.xml not found".to_string()));
    }
    extract_w_t_elements(&doc_xml)
}

/// Pull the text runs (`<w:t>` elements) out of a WordprocessingML body.
fn extract_w_t_elements(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        if !out.is_empty() {
                            out.push(' ');
                        }
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}
