//! Text cleanup and naming for the knowledge-base copies of uploaded documents

use std::path::Path;

pub const PROCESSED_TEXT_PREFIX: &str = "processed_raw_text";

/// Drops blank lines, then collapses every whitespace run to a single space
pub fn clean_text(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `reports/2024/rfp.final.pdf` becomes `processed_raw_text/rfp.final.txt`
pub fn kb_object_name(source_object: &str) -> String {
    let stem = Path::new(source_object)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source_object);
    format!("{}/{}.txt", PROCESSED_TEXT_PREFIX, stem)
}

pub fn is_pdf(object_name: &str) -> bool {
    object_name.to_lowercase().ends_with(".pdf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn test_clean_text() {
        let raw = "Section 1\n\n   \n  The system   shall\texport\nreports.  \n\n";
        assert_eq!(clean_text(raw), "Section 1 The system shall export reports.");
    }

    #[test]
    fn test_clean_text_empty() {
        assert_eq!(clean_text("\n \n\t\n"), "");
    }

    #[parameterized(
        nested = { "reports/2024/rfp.final.pdf", "processed_raw_text/rfp.final.txt" },
        flat = { "mom.PDF", "processed_raw_text/mom.txt" },
        spaces = { "uploads/Design Doc.pdf", "processed_raw_text/Design Doc.txt" },
    )]
    fn test_kb_object_name(source: &str, expected: &str) {
        assert_eq!(kb_object_name(source), expected);
    }

    #[parameterized(
        lower = { "a.pdf", true },
        upper = { "A.PDF", true },
        docx = { "a.docx", false },
        no_ext = { "pdf", false },
    )]
    fn test_is_pdf(name: &str, expected: bool) {
        assert_eq!(is_pdf(name), expected);
    }
}
