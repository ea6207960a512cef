//! Condition field catalog.
//!
//! Single source of truth mapping every evaluable field to its value type
//! and the operator set legal for that type. The trigger-builder UI and
//! the evaluator's generic-condition path both consume this catalog, so
//! field/operator legality is defined exactly once.

use serde::{Deserialize, Serialize};

use crate::domain::record::RecordType;
use crate::error::{AdmitrError, Result};

/// Value type of an evaluable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Boolean,
    Select,
    Array,
}

/// Comparison operators for field conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    GreaterThan,
    LessThan,
    Between,
    InList,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::IsEmpty => "is_empty",
            Operator::IsNotEmpty => "is_not_empty",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::Between => "between",
            Operator::InList => "in_list",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "equals" => Ok(Operator::Equals),
            "not_equals" => Ok(Operator::NotEquals),
            "contains" => Ok(Operator::Contains),
            "not_contains" => Ok(Operator::NotContains),
            "starts_with" => Ok(Operator::StartsWith),
            "ends_with" => Ok(Operator::EndsWith),
            "is_empty" => Ok(Operator::IsEmpty),
            "is_not_empty" => Ok(Operator::IsNotEmpty),
            "greater_than" => Ok(Operator::GreaterThan),
            "less_than" => Ok(Operator::LessThan),
            "between" => Ok(Operator::Between),
            "in_list" => Ok(Operator::InList),
            other => Err(format!("unknown operator: {}", other)),
        }
    }
}

/// The operator set legal for a field type. No other component hardcodes
/// a competing list.
pub fn operators_for(field_type: FieldType) -> &'static [Operator] {
    match field_type {
        FieldType::Text => &[
            Operator::Equals,
            Operator::NotEquals,
            Operator::Contains,
            Operator::NotContains,
            Operator::StartsWith,
            Operator::EndsWith,
            Operator::IsEmpty,
            Operator::IsNotEmpty,
        ],
        FieldType::Number => &[
            Operator::Equals,
            Operator::NotEquals,
            Operator::GreaterThan,
            Operator::LessThan,
            Operator::Between,
            Operator::IsEmpty,
            Operator::IsNotEmpty,
        ],
        FieldType::Date => &[
            Operator::Equals,
            Operator::NotEquals,
            Operator::GreaterThan,
            Operator::LessThan,
            Operator::Between,
            Operator::IsEmpty,
            Operator::IsNotEmpty,
        ],
        FieldType::Boolean => &[Operator::Equals, Operator::NotEquals],
        FieldType::Select => &[
            Operator::Equals,
            Operator::NotEquals,
            Operator::InList,
            Operator::IsEmpty,
            Operator::IsNotEmpty,
        ],
        FieldType::Array => &[
            Operator::Contains,
            Operator::NotContains,
            Operator::IsEmpty,
            Operator::IsNotEmpty,
        ],
    }
}

/// One evaluable field definition.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDef {
    pub name: &'static str,
    pub label: &'static str,
    pub field_type: FieldType,
    /// Which record types this field exists on
    pub applies_to: &'static [RecordType],
    /// Legal values for Select fields, empty otherwise
    pub options: &'static [&'static str],
}

impl FieldDef {
    pub fn applies_to(&self, record_type: RecordType) -> bool {
        self.applies_to.contains(&record_type)
    }

    pub fn operators(&self) -> &'static [Operator] {
        operators_for(self.field_type)
    }
}

const ALL: &[RecordType] = &[RecordType::Lead, RecordType::Applicant, RecordType::Student];
const LEAD_ONLY: &[RecordType] = &[RecordType::Lead];
const APPLICANT_UP: &[RecordType] = &[RecordType::Applicant, RecordType::Student];

const FIELDS: &[FieldDef] = &[
    FieldDef {
        name: "first_name",
        label: "First name",
        field_type: FieldType::Text,
        applies_to: ALL,
        options: &[],
    },
    FieldDef {
        name: "last_name",
        label: "Last name",
        field_type: FieldType::Text,
        applies_to: ALL,
        options: &[],
    },
    FieldDef {
        name: "email",
        label: "Email",
        field_type: FieldType::Text,
        applies_to: ALL,
        options: &[],
    },
    FieldDef {
        name: "phone",
        label: "Phone",
        field_type: FieldType::Text,
        applies_to: ALL,
        options: &[],
    },
    FieldDef {
        name: "source",
        label: "Lead source",
        field_type: FieldType::Select,
        applies_to: LEAD_ONLY,
        options: &["web_form", "referral", "education_fair", "ads", "walk_in"],
    },
    FieldDef {
        name: "program",
        label: "Program of interest",
        field_type: FieldType::Text,
        applies_to: ALL,
        options: &[],
    },
    FieldDef {
        name: "lead_score",
        label: "Lead score",
        field_type: FieldType::Number,
        applies_to: LEAD_ONLY,
        options: &[],
    },
    FieldDef {
        name: "gpa",
        label: "GPA",
        field_type: FieldType::Number,
        applies_to: APPLICANT_UP,
        options: &[],
    },
    FieldDef {
        name: "created_at",
        label: "Created",
        field_type: FieldType::Date,
        applies_to: ALL,
        options: &[],
    },
    FieldDef {
        name: "last_contacted_at",
        label: "Last contacted",
        field_type: FieldType::Date,
        applies_to: LEAD_ONLY,
        options: &[],
    },
    FieldDef {
        name: "application_submitted_at",
        label: "Application submitted",
        field_type: FieldType::Date,
        applies_to: APPLICANT_UP,
        options: &[],
    },
    FieldDef {
        name: "tags",
        label: "Tags",
        field_type: FieldType::Array,
        applies_to: ALL,
        options: &[],
    },
    FieldDef {
        name: "is_international",
        label: "International student",
        field_type: FieldType::Boolean,
        applies_to: APPLICANT_UP,
        options: &[],
    },
    FieldDef {
        name: "scholarship_requested",
        label: "Scholarship requested",
        field_type: FieldType::Boolean,
        applies_to: APPLICANT_UP,
        options: &[],
    },
];

/// Catalog of evaluable fields per entity.
#[derive(Debug, Clone)]
pub struct ConditionFieldRegistry {
    fields: &'static [FieldDef],
}

impl ConditionFieldRegistry {
    pub fn new() -> Self {
        Self { fields: FIELDS }
    }

    pub fn fields(&self) -> &[FieldDef] {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields_for(&self, record_type: RecordType) -> Vec<&FieldDef> {
        self.fields
            .iter()
            .filter(|f| f.applies_to(record_type))
            .collect()
    }

    /// Look up a field, erroring on unknown names.
    pub fn require_field(&self, name: &str) -> Result<&FieldDef> {
        self.field(name).ok_or_else(|| {
            AdmitrError::TriggerConfig(format!("unknown condition field: {}", name))
        })
    }

    pub fn is_operator_legal(&self, field_type: FieldType, operator: Operator) -> bool {
        operators_for(field_type).contains(&operator)
    }
}

impl Default for ConditionFieldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lookup() {
        let registry = ConditionFieldRegistry::new();
        let field = registry.field("lead_score").unwrap();
        assert_eq!(field.field_type, FieldType::Number);
        assert!(field.applies_to(RecordType::Lead));
        assert!(!field.applies_to(RecordType::Student));
    }

    #[test]
    fn test_unknown_field() {
        let registry = ConditionFieldRegistry::new();
        assert!(registry.field("favourite_color").is_none());
        assert!(matches!(
            registry.require_field("favourite_color"),
            Err(AdmitrError::TriggerConfig(_))
        ));
    }

    #[test]
    fn test_fields_for_entity() {
        let registry = ConditionFieldRegistry::new();
        let lead_fields = registry.fields_for(RecordType::Lead);
        assert!(lead_fields.iter().any(|f| f.name == "source"));
        assert!(lead_fields.iter().all(|f| f.name != "gpa"));

        let student_fields = registry.fields_for(RecordType::Student);
        assert!(student_fields.iter().any(|f| f.name == "gpa"));
        assert!(student_fields.iter().all(|f| f.name != "lead_score"));
    }

    #[test]
    fn test_text_operators() {
        let ops = operators_for(FieldType::Text);
        assert!(ops.contains(&Operator::Contains));
        assert!(ops.contains(&Operator::StartsWith));
        assert!(ops.contains(&Operator::IsEmpty));
        assert!(!ops.contains(&Operator::Between));
        assert!(!ops.contains(&Operator::GreaterThan));
    }

    #[test]
    fn test_number_operators() {
        let ops = operators_for(FieldType::Number);
        assert!(ops.contains(&Operator::Between));
        assert!(ops.contains(&Operator::GreaterThan));
        assert!(ops.contains(&Operator::LessThan));
        assert!(!ops.contains(&Operator::Contains));
    }

    #[test]
    fn test_boolean_operators() {
        let ops = operators_for(FieldType::Boolean);
        assert_eq!(ops, &[Operator::Equals, Operator::NotEquals]);
    }

    #[test]
    fn test_operator_legality() {
        let registry = ConditionFieldRegistry::new();
        assert!(registry.is_operator_legal(FieldType::Date, Operator::Between));
        assert!(!registry.is_operator_legal(FieldType::Boolean, Operator::Contains));
        assert!(!registry.is_operator_legal(FieldType::Array, Operator::GreaterThan));
    }

    #[test]
    fn test_select_field_carries_options() {
        let registry = ConditionFieldRegistry::new();
        let source = registry.field("source").unwrap();
        assert_eq!(source.field_type, FieldType::Select);
        assert!(source.options.contains(&"referral"));
    }

    #[test]
    fn test_operator_display_and_parse() {
        for op in [
            Operator::Equals,
            Operator::NotEquals,
            Operator::Contains,
            Operator::NotContains,
            Operator::StartsWith,
            Operator::EndsWith,
            Operator::IsEmpty,
            Operator::IsNotEmpty,
            Operator::GreaterThan,
            Operator::LessThan,
            Operator::Between,
            Operator::InList,
        ] {
            assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
        }
        assert!("matches_regex".parse::<Operator>().is_err());
    }

    #[test]
    fn test_operator_serde_matches_as_str() {
        let json = serde_json::to_string(&Operator::GreaterThan).unwrap();
        assert_eq!(json, "\"greater_than\"");
    }

    #[test]
    fn test_field_operators_accessor() {
        let registry = ConditionFieldRegistry::new();
        let tags = registry.field("tags").unwrap();
        assert_eq!(tags.operators(), operators_for(FieldType::Array));
    }
}
