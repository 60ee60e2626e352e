//! User requirement records and the tool payloads built around them

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequirementError {
    #[error("Requirement ID {0} not found in current requirements list.")]
    NotFound(String),

    #[error("LLM generated invalid data for updated requirement. Details: {0}")]
    InvalidUpdate(String),

    #[error("Requirement ID {0} appears more than once; requirement IDs must be unique.")]
    DuplicateId(String),

    #[error("Requirement #{index} is invalid: {message}")]
    InvalidRequirement { index: usize, message: String },

    #[error("Extracted detail #{index} is invalid: {message}")]
    InvalidDetail { index: usize, message: String },
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const VALUES: &'static [&'static str] = &[$($value),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// Origin of the requirement
    RequirementType {
        Original => "Original",
        ChangeRequest => "Change Request",
    }
);

string_enum!(
    /// Whether the requirement belongs to the current project, release or sprint
    RequirementScope {
        InScope => "In-Scope",
        OutOfScope => "Out-Scope",
    }
);

string_enum!(
    RequirementPriority {
        High => "High",
        Medium => "Medium",
        Low => "Low",
    }
);

string_enum!(
    /// Whether another requirement already covers or duplicates this one
    RequirementCoverage {
        Yes => "Yes",
        No => "No",
    }
);

/// What a user needs to be able to do with a system, product or service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRequirement {
    /// Unique identifier, e.g. `USR0150`
    pub id: String,
    pub name: String,
    /// Source file or document the requirement was derived from
    pub source: String,
    #[serde(rename = "type")]
    pub requirement_type: RequirementType,
    pub scope: RequirementScope,
    pub detail: String,
    pub priority: RequirementPriority,
    pub covered_usr: RequirementCoverage,
}

impl UserRequirement {
    pub const FIELDS: [&'static str; 8] = [
        "id",
        "name",
        "source",
        "type",
        "scope",
        "detail",
        "priority",
        "covered_usr",
    ];

    pub fn is_field(name: &str) -> bool {
        Self::FIELDS.contains(&name)
    }

    /// Allowed wire values for the enumerated fields, `None` for free-text fields
    pub fn allowed_values(field: &str) -> Option<&'static [&'static str]> {
        match field {
            "type" => Some(RequirementType::VALUES),
            "scope" => Some(RequirementScope::VALUES),
            "priority" => Some(RequirementPriority::VALUES),
            "covered_usr" => Some(RequirementCoverage::VALUES),
            _ => None,
        }
    }

    /// Closest valid field name for a misspelled one
    pub fn suggest_field(name: &str) -> Option<&'static str> {
        let name = name.to_lowercase();
        Self::FIELDS
            .iter()
            .map(|field| (*field, strsim::jaro_winkler(&name, field)))
            .filter(|(_, score)| *score >= 0.8)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(field, _)| field)
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Checks that every requirement id is non-empty and used once
pub fn validate_requirements(requirements: &[UserRequirement]) -> Result<(), RequirementError> {
    let mut seen = HashSet::new();
    for (index, requirement) in requirements.iter().enumerate() {
        if requirement.id.trim().is_empty() {
            return Err(RequirementError::InvalidRequirement {
                index,
                message: "id must not be empty".to_string(),
            });
        }
        if !seen.insert(requirement.id.as_str()) {
            return Err(RequirementError::DuplicateId(requirement.id.clone()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDetail {
    /// e.g. "Functional Requirement", "Stakeholder", "Constraint"
    pub category: String,
    pub statement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_reference: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ExtractedDetail {
    pub fn validate(&self) -> Result<(), String> {
        if self.category.trim().is_empty() {
            return Err("category must not be empty".to_string());
        }
        if self.statement.trim().is_empty() {
            return Err("statement must not be empty".to_string());
        }
        if let Some(page) = self.page_reference {
            if page == 0 {
                return Err("page_reference is 1-based".to_string());
            }
        }
        if let Some(confidence) = self.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(format!(
                    "confidence must be between 0.0 and 1.0, got {}",
                    confidence
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedInformation {
    #[serde(default)]
    pub source_document_id: Option<String>,
    #[serde(default)]
    pub summary_of_extraction: Option<String>,
    #[serde(default)]
    pub details: Vec<ExtractedDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalUserRequirementsOutput {
    #[serde(default)]
    pub document_id: Option<String>,
    pub requirements_list: Vec<UserRequirement>,
    #[serde(default)]
    pub generation_summary: Option<String>,
}

impl fmt::Display for FinalUserRequirementsOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "User Requirements")?;
        writeln!(f, "=================")?;
        if let Some(ref document_id) = self.document_id {
            writeln!(f, "Document: {}", document_id)?;
        }
        writeln!(f, "Count: {}", self.requirements_list.len())?;
        for requirement in &self.requirements_list {
            writeln!(f)?;
            write!(f, "{}", requirement)?;
        }
        if let Some(ref summary) = self.generation_summary {
            writeln!(f)?;
            writeln!(f, "Summary:")?;
            writeln!(f, "  {}", summary)?;
        }
        Ok(())
    }
}

impl fmt::Display for UserRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] {}", self.id, self.name)?;
        writeln!(
            f,
            "  {} | {} | Priority: {} | Covered: {}",
            self.requirement_type, self.scope, self.priority, self.covered_usr
        )?;
        writeln!(f, "  Source: {}", self.source)?;
        writeln!(f, "  {}", self.detail)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateInstructions {
    pub requirement_id_to_update: String,
    /// UserRequirement field names mapped to their new values
    pub updated_fields: Map<String, Value>,
    #[serde(default)]
    pub reason_for_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatedUserRequirementsOutput {
    pub updated_requirement: UserRequirement,
    pub update_summary: String,
    #[serde(default)]
    pub previous_version_snapshot: Option<UserRequirement>,
    /// Input list with the updated record substituted in place
    #[serde(default)]
    pub updated_requirements_list: Vec<Value>,
}
