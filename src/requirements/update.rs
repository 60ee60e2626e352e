//! Field-by-field merge of LLM-provided updates into one requirement

use super::model::{
    RequirementError, UpdateInstructions, UpdatedUserRequirementsOutput, UserRequirement,
};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Applies `instructions` to the matching record of `current_requirements_list`.
///
/// Unknown fields and out-of-vocabulary enum values are skipped with a warning;
/// everything else is assigned and the merged record must still be a valid
/// `UserRequirement`. A changed id must not be used by any other record.
pub fn update_user_requirements(
    current_requirements_list: &[Value],
    instructions: &UpdateInstructions,
) -> Result<UpdatedUserRequirementsOutput, RequirementError> {
    let target_id = instructions.requirement_id_to_update.as_str();
    info!(
        requirement_id = target_id,
        fields = instructions.updated_fields.len(),
        "Updating user requirement"
    );
    debug!(updated_fields = ?instructions.updated_fields, "Changes requested");

    let (index, found) = current_requirements_list
        .iter()
        .enumerate()
        .find(|(_, record)| record.get("id").and_then(Value::as_str) == Some(target_id))
        .ok_or_else(|| RequirementError::NotFound(target_id.to_string()))?;

    let previous_version_snapshot = match UserRequirement::from_value(found.clone()) {
        Ok(requirement) => Some(requirement),
        Err(e) => {
            warn!(
                requirement_id = target_id,
                error = %e,
                "Could not parse original requirement; no snapshot kept"
            );
            None
        }
    };

    let mut updated = found.as_object().cloned().unwrap_or_default();

    for (field, new_value) in &instructions.updated_fields {
        if !UserRequirement::is_field(field) {
            match UserRequirement::suggest_field(field) {
                Some(suggestion) => warn!(
                    field = %field,
                    suggestion,
                    "Not a UserRequirement field, skipping (did you mean '{}'?)",
                    suggestion
                ),
                None => warn!(field = %field, "Not a UserRequirement field, skipping"),
            }
            continue;
        }

        if let (Some(allowed), Some(text)) =
            (UserRequirement::allowed_values(field), new_value.as_str())
        {
            if !allowed.contains(&text) {
                warn!(
                    field = %field,
                    value = text,
                    allowed = ?allowed,
                    "Invalid value for enumerated field, skipping"
                );
                continue;
            }
        }

        updated.insert(field.clone(), new_value.clone());
    }

    let merged = Value::Object(updated);
    let updated_requirement = UserRequirement::from_value(merged.clone()).map_err(|e| {
        warn!(requirement_id = target_id, data = %merged, "Merged requirement failed validation");
        RequirementError::InvalidUpdate(e.to_string())
    })?;

    let id_changed = updated_requirement.id != target_id;
    let collides = id_changed
        && current_requirements_list
            .iter()
            .enumerate()
            .any(|(i, record)| {
                i != index
                    && record.get("id").and_then(Value::as_str)
                        == Some(updated_requirement.id.as_str())
            });
    if collides {
        return Err(RequirementError::DuplicateId(updated_requirement.id));
    }

    let mut updated_requirements_list = current_requirements_list.to_vec();
    updated_requirements_list[index] = merged;

    let update_summary = format!(
        "Successfully processed update for requirement ID: {}. Reason: {}.",
        target_id,
        instructions
            .reason_for_update
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or("Not specified")
    );

    Ok(UpdatedUserRequirementsOutput {
        updated_requirement,
        update_summary,
        previous_version_snapshot,
        updated_requirements_list,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::model::{RequirementPriority, RequirementScope};
    use serde_json::{json, Map};
    use yare::parameterized;

    fn requirement(id: &str) -> Value {
        json!({
            "id": id,
            "name": "Export reports",
            "source": "mom-2024-03.pdf",
            "type": "Original",
            "scope": "In-Scope",
            "detail": "Users export monthly reports as CSV",
            "priority": "Medium",
            "covered_usr": "No"
        })
    }

    fn instructions(id: &str, fields: Value, reason: Option<&str>) -> UpdateInstructions {
        let updated_fields: Map<String, Value> = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        UpdateInstructions {
            requirement_id_to_update: id.to_string(),
            updated_fields,
            reason_for_update: reason.map(str::to_string),
        }
    }

    #[test]
    fn test_applies_valid_fields() {
        let list = vec![requirement("USR0001"), requirement("USR0002")];
        let output = update_user_requirements(
            &list,
            &instructions(
                "USR0002",
                json!({"priority": "High", "detail": "Users export reports as CSV or PDF"}),
                Some("Customer feedback"),
            ),
        )
        .unwrap();

        assert_eq!(output.updated_requirement.priority, RequirementPriority::High);
        assert_eq!(output.updated_requirement.detail, "Users export reports as CSV or PDF");
        assert_eq!(
            output.previous_version_snapshot.unwrap().priority,
            RequirementPriority::Medium
        );
        assert_eq!(
            output.update_summary,
            "Successfully processed update for requirement ID: USR0002. Reason: Customer feedback."
        );
        assert_eq!(output.updated_requirements_list[0], list[0]);
        assert_eq!(output.updated_requirements_list[1]["priority"], "High");
    }

    #[test]
    fn test_missing_id() {
        let err = update_user_requirements(
            &[requirement("USR0001")],
            &instructions("USR9999", json!({"priority": "Low"}), None),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Requirement ID USR9999 not found in current requirements list."
        );
    }

    #[test]
    fn test_unknown_fields_and_bad_enum_values_are_skipped() {
        let output = update_user_requirements(
            &[requirement("USR0001")],
            &instructions(
                "USR0001",
                json!({"priorty": "Low", "scope": "Maybe", "owner": "ops", "name": "CSV export"}),
                None,
            ),
        )
        .unwrap();

        let updated = &output.updated_requirement;
        assert_eq!(updated.priority, RequirementPriority::Medium);
        assert_eq!(updated.scope, RequirementScope::InScope);
        assert_eq!(updated.name, "CSV export");
        assert!(output.update_summary.ends_with("Reason: Not specified."));
        assert!(output.updated_requirements_list[0].get("owner").is_none());
    }

    #[parameterized(
        number_for_enum = { json!({"priority": 3}) },
        null_detail = { json!({"detail": null}) },
        list_for_name = { json!({"name": ["a", "b"]}) },
    )]
    fn test_invalid_merged_record(fields: Value) {
        let err = update_user_requirements(
            &[requirement("USR0001")],
            &instructions("USR0001", fields, None),
        )
        .unwrap_err();
        assert!(matches!(err, RequirementError::InvalidUpdate(_)));
        assert!(err
            .to_string()
            .starts_with("LLM generated invalid data for updated requirement. Details: "));
    }

    #[test]
    fn test_snapshot_missing_for_malformed_original() {
        let partial = json!({"id": "USR0001", "name": "Incomplete"});
        let mut fields = requirement("USR0001");
        fields.as_object_mut().unwrap().remove("id");

        let output = update_user_requirements(
            &[partial],
            &instructions("USR0001", fields, Some("Complete the record")),
        )
        .unwrap();

        assert!(output.previous_version_snapshot.is_none());
        assert_eq!(output.updated_requirement.name, "Export reports");
    }

    #[test]
    fn test_id_change_must_stay_unique() {
        let list = vec![requirement("USR0001"), requirement("USR0002")];
        let err = update_user_requirements(
            &list,
            &instructions("USR0002", json!({"id": "USR0001"}), None),
        )
        .unwrap_err();
        assert_eq!(err, RequirementError::DuplicateId("USR0001".to_string()));

        let output = update_user_requirements(
            &list,
            &instructions("USR0002", json!({"id": "USR0003"}), None),
        )
        .unwrap();
        assert_eq!(output.updated_requirement.id, "USR0003");
    }

    #[test]
    fn test_first_matching_record_wins() {
        let mut second = requirement("USR0001");
        second["name"] = json!("Duplicate");
        let list = vec![requirement("USR0001"), second];

        let output = update_user_requirements(
            &list,
            &instructions("USR0001", json!({"priority": "Low"}), None),
        )
        .unwrap();

        assert_eq!(output.updated_requirements_list[0]["priority"], "Low");
        assert_eq!(output.updated_requirements_list[1], list[1]);
    }

    #[test]
    fn test_keeping_id_with_duplicate_input_is_allowed() {
        let list = vec![requirement("USR0001"), requirement("USR0001")];
        let output = update_user_requirements(
            &list,
            &instructions("USR0001", json!({"id": "USR0001", "name": "Renamed"}), None),
        )
        .unwrap();
        assert_eq!(output.updated_requirement.name, "Renamed");
        assert_eq!(output.updated_requirements_list[1]["name"], "Export reports");
    }
}
