//! Validation of LLM-extracted details

use super::model::{ExtractedDetail, ExtractedInformation, RequirementError};
use serde_json::Value;
use tracing::info;

/// Packages the details the LLM pulled out of a document, rejecting records
/// with empty text or confidence outside `[0.0, 1.0]`.
pub fn extract_specific_details(
    source_document_id: Option<&str>,
    summary_of_extraction: Option<&str>,
    details: &[Value],
) -> Result<ExtractedInformation, RequirementError> {
    let mut parsed = Vec::with_capacity(details.len());

    for (index, record) in details.iter().enumerate() {
        let detail: ExtractedDetail =
            serde_json::from_value(record.clone()).map_err(|e| RequirementError::InvalidDetail {
                index,
                message: e.to_string(),
            })?;
        detail
            .validate()
            .map_err(|message| RequirementError::InvalidDetail { index, message })?;
        parsed.push(detail);
    }

    info!(
        document = source_document_id.unwrap_or("N/A"),
        details = parsed.len(),
        "Recorded extracted details"
    );

    Ok(ExtractedInformation {
        source_document_id: source_document_id.map(str::to_string),
        summary_of_extraction: summary_of_extraction.map(str::to_string),
        details: parsed,
    })
}
