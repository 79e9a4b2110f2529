use crate::model::{RuleType, ValidationRule};

/// Rules every BPMN process record is checked against.
pub fn builtin_bpmn_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::new(
            "processId",
            RuleType::Required,
            "",
            "Process ID is required",
        )
        .builtin(),
        ValidationRule::new(
            "status",
            RuleType::Enum,
            "ACTIVE,INACTIVE,PENDING",
            "Status must be one of ACTIVE, INACTIVE, PENDING",
        )
        .builtin(),
        ValidationRule::new(
            "priority",
            RuleType::Range,
            "1-5",
            "Priority must be between 1 and 5",
        )
        .builtin(),
        ValidationRule::new(
            "assignedTo",
            RuleType::Required,
            "",
            "Task assignment is required",
        )
        .builtin(),
    ]
}

/// Rules every API payload record is checked against.
pub fn builtin_api_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::new("id", RuleType::Uuid, "", "ID must be a valid UUID").builtin(),
        ValidationRule::new("email", RuleType::Email, "", "Email must be valid").builtin(),
        ValidationRule::new("phone", RuleType::Phone, "", "Phone must be valid").builtin(),
        ValidationRule::new("url", RuleType::Url, "", "URL must be valid").builtin(),
        ValidationRule::new("age", RuleType::Range, "18-120", "Age must be between 18 and 120")
            .builtin(),
        ValidationRule::new(
            "createdAt",
            RuleType::Datetime,
            "",
            "Created date must be a valid ISO-8601 date-time",
        )
        .builtin(),
    ]
}
