//! User requirement records plus the generate, update and extract operations
//! the agent calls with LLM-authored data

pub mod extract;
pub mod generate;
pub mod model;
pub mod update;

pub use extract::extract_specific_details;
pub use generate::{generate_user_requirements, DEFAULT_GENERATION_GUIDELINES};
pub use model::{
    validate_requirements, ExtractedDetail, ExtractedInformation, FinalUserRequirementsOutput,
    RequirementCoverage, RequirementError, RequirementPriority, RequirementScope,
    RequirementType, UpdateInstructions, UpdatedUserRequirementsOutput, UserRequirement,
};
pub use update::update_user_requirements;
