//! PDF Text Extractor — turns an uploaded résumé into plain text.
//!
//! The file only lives in memory for the duration of the call; nothing is
//! retained afterwards. All parsing is delegated to the `pdf-extract` crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("file is {actual_bytes} bytes, above the {limit_bytes} byte limit")]
    TooLarge {
        limit_bytes: usize,
        actual_bytes: usize,
    },

    #[error("not a parseable PDF: {0}")]
    InvalidFormat(String),

    #[error("document contains no usable text")]
    Empty,
}

/// Extracts UTF-8 text from PDF bytes.
///
/// A zero-byte upload and a structurally valid PDF with no embedded text
/// layer (e.g. a pure scan) both come back as `Empty`; bytes that do not
/// parse as a PDF at all are `InvalidFormat`.
pub fn extract_text(bytes: &[u8], max_bytes: usize) -> Result<String, ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::Empty);
    }
    if bytes.len() > max_bytes {
        return Err(ExtractError::TooLarge {
            limit_bytes: max_bytes,
            actual_bytes: bytes.len(),
        });
    }

    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExtractError::InvalidFormat(e.to_string()))?;

    let text = text.trim();
    if text.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(text.to_string())
}

/// Builds a minimal one-page PDF containing `text`, with xref offsets
/// computed from the assembled body. Shared by extractor and pipeline tests.
#[cfg(test)]
pub(crate) fn minimal_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }

    let xref_offset = out.len();
    out.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
    out.push_str("0000000000 65535 f \n");
    for off in &offsets {
        out.push_str(&format!("{off:010} 00000 n \n"));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    ));
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 10 * 1024 * 1024;

    #[test]
    fn test_valid_pdf_yields_text() {
        let pdf = minimal_pdf("Five years of Rust and SQL");
        let text = extract_text(&pdf, LIMIT).unwrap();
        assert!(text.contains("Rust"), "got: {text:?}");
    }

    #[test]
    fn test_zero_byte_file_is_empty() {
        assert!(matches!(extract_text(&[], LIMIT), Err(ExtractError::Empty)));
    }

    #[test]
    fn test_non_pdf_bytes_are_invalid_format() {
        let result = extract_text(b"plain text, definitely not a PDF", LIMIT);
        assert!(matches!(result, Err(ExtractError::InvalidFormat(_))));
    }

    #[test]
    fn test_oversized_file_rejected_before_parsing() {
        let pdf = minimal_pdf("hi");
        let result = extract_text(&pdf, 8);
        assert!(matches!(
            result,
            Err(ExtractError::TooLarge {
                limit_bytes: 8,
                ..
            })
        ));
    }
}
