//! Packaging of LLM-authored requirements into the final output record

use super::model::{
    validate_requirements, FinalUserRequirementsOutput, RequirementError, UserRequirement,
};
use serde_json::Value;
use tracing::info;

pub const DEFAULT_GENERATION_GUIDELINES: &str = "Generate comprehensive user requirements based on the extracted information, ensuring all fields of the UserRequirement model are considered.";

const EMPTY_LIST_SUMMARY: &str = "No requirements were supplied. Author the requirements from the extracted information and call this tool again with requirements_list, populating every UserRequirement field (id, name, source, type, scope, detail, priority, covered_usr).";

/// Builds the final requirements output for one extraction.
///
/// `requirements_list` holds the records the LLM authored; each must parse as a
/// `UserRequirement` and ids must be unique. The document id is taken from
/// `extracted_information.source_document_id`.
pub fn generate_user_requirements(
    extracted_information: &Value,
    generation_guidelines: Option<&str>,
    requirements_list: Option<&[Value]>,
) -> Result<FinalUserRequirementsOutput, RequirementError> {
    let guidelines = generation_guidelines
        .filter(|g| !g.trim().is_empty())
        .unwrap_or(DEFAULT_GENERATION_GUIDELINES);
    let document_id = extracted_information
        .get("source_document_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    let summary = extracted_information
        .get("summary_of_extraction")
        .and_then(Value::as_str)
        .unwrap_or("N/A");

    info!(
        document_id = document_id.as_deref().unwrap_or("N/A"),
        summary,
        guidelines,
        "Generating user requirements"
    );

    let supplied = requirements_list.unwrap_or_default();
    let mut requirements = Vec::with_capacity(supplied.len());
    for (index, record) in supplied.iter().enumerate() {
        let requirement = UserRequirement::from_value(record.clone()).map_err(|e| {
            RequirementError::InvalidRequirement {
                index,
                message: e.to_string(),
            }
        })?;
        requirements.push(requirement);
    }
    validate_requirements(&requirements)?;

    let generation_summary = if requirements.is_empty() {
        EMPTY_LIST_SUMMARY.to_string()
    } else {
        format!(
            "Generated {} user requirement(s) for document {}.",
            requirements.len(),
            document_id.as_deref().unwrap_or("N/A")
        )
    };

    Ok(FinalUserRequirementsOutput {
        document_id,
        requirements_list: requirements,
        generation_summary: Some(generation_summary),
    })
}
