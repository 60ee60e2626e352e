//! Tools wrapping the requirements operations. Their arguments are authored by
//! the LLM, so malformed input is returned as an error for it to correct.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::helpers::optional_str;
use super::trait_def::Tool;
use crate::requirements::{
    extract_specific_details, generate_user_requirements, update_user_requirements,
    UpdateInstructions, UserRequirement,
};

fn object_list<'a>(args: &'a Value, key: &str) -> Result<&'a [Value]> {
    args[key]
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| anyhow!("'{}' must be an array of objects", key))
}

fn requirement_properties() -> Value {
    json!({
        "id": { "type": "string", "description": "Unique id, e.g. USR0001" },
        "name": { "type": "string" },
        "source": { "type": "string", "description": "Document the requirement came from" },
        "type": { "type": "string", "enum": ["Original", "Change Request"] },
        "scope": { "type": "string", "enum": ["In-Scope", "Out-Scope"] },
        "detail": { "type": "string" },
        "priority": { "type": "string", "enum": ["High", "Medium", "Low"] },
        "covered_usr": { "type": "string", "enum": ["Yes", "No"] }
    })
}

pub struct ExtractSpecificDetailsTool;

#[async_trait]
impl Tool for ExtractSpecificDetailsTool {
    fn name(&self) -> &'static str {
        "extract_specific_details"
    }

    fn description(&self) -> &'static str {
        "Record the key details extracted from a document text as structured information"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "source_document_id": {
                    "type": "string",
                    "description": "Identifier of the document, e.g. its gs:// URI"
                },
                "summary_of_extraction": {
                    "type": "string",
                    "description": "Short summary of what was extracted"
                },
                "details": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "category": { "type": "string", "description": "e.g. Functional Requirement, Stakeholder, Constraint" },
                            "statement": { "type": "string" },
                            "page_reference": { "type": "integer" },
                            "confidence": { "type": "number", "description": "Between 0.0 and 1.0" }
                        },
                        "required": ["category", "statement"]
                    }
                }
            },
            "required": ["details"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let information = extract_specific_details(
            optional_str(&args, "source_document_id"),
            optional_str(&args, "summary_of_extraction"),
            object_list(&args, "details")?,
        )?;
        Ok(serde_json::to_value(information)?)
    }
}

pub struct GenerateRequirementsTool;

#[async_trait]
impl Tool for GenerateRequirementsTool {
    fn name(&self) -> &'static str {
        "generate_user_requirements"
    }

    fn description(&self) -> &'static str {
        "Compile extracted information into a formal list of user requirements"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "extracted_information": {
                    "type": "object",
                    "description": "Output of extract_specific_details"
                },
                "generation_guidelines": {
                    "type": "string",
                    "description": "Extra guidance for how requirements should be written"
                },
                "requirements_list": {
                    "type": "array",
                    "description": "The requirements, with every field populated",
                    "items": {
                        "type": "object",
                        "properties": requirement_properties(),
                        "required": UserRequirement::FIELDS
                    }
                }
            },
            "required": ["extracted_information"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        if !args["extracted_information"].is_object() {
            return Err(anyhow!("'extracted_information' must be an object"));
        }
        let requirements = match &args["requirements_list"] {
            Value::Null => None,
            _ => Some(object_list(&args, "requirements_list")?),
        };

        let output = generate_user_requirements(
            &args["extracted_information"],
            optional_str(&args, "generation_guidelines"),
            requirements,
        )?;
        Ok(serde_json::to_value(output)?)
    }
}

pub struct UpdateRequirementsTool;

#[async_trait]
impl Tool for UpdateRequirementsTool {
    fn name(&self) -> &'static str {
        "update_user_requirements"
    }

    fn description(&self) -> &'static str {
        "Apply changes to one requirement in an existing list of user requirements"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "current_requirements_list": {
                    "type": "array",
                    "items": { "type": "object", "properties": requirement_properties() },
                    "description": "The full current list of requirements"
                },
                "update_instructions": {
                    "type": "object",
                    "properties": {
                        "requirement_id_to_update": { "type": "string" },
                        "updated_fields": {
                            "type": "object",
                            "description": "Requirement field names mapped to their new values"
                        },
                        "reason_for_update": { "type": "string" }
                    },
                    "required": ["requirement_id_to_update", "updated_fields"]
                }
            },
            "required": ["current_requirements_list", "update_instructions"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let current = object_list(&args, "current_requirements_list")?;
        let instructions: UpdateInstructions =
            serde_json::from_value(args["update_instructions"].clone())
                .context("Invalid 'update_instructions'")?;

        let output = update_user_requirements(current, &instructions)?;
        Ok(serde_json::to_value(output)?)
    }
}
