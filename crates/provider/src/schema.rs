//! Resource schemas
//!
//! A [`Schema`] declares the attributes of a resource block, how they may
//! be set, and the validators that run against configuration before any
//! remote call is made.

use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::state::DynamicValue;

/// Top level schema of a resource or provider block
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

/// A set of attributes, possibly nested inside a set attribute
#[derive(Debug, Clone, Default, Serialize)]
pub struct Block {
    pub attributes: Vec<Attribute>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "block")]
pub enum AttributeKind {
    String,
    Int,
    Bool,
    /// Unordered collection of nested blocks
    Set(Block),
}

#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    pub kind: AttributeKind,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// Changing the value forces the resource to be replaced
    pub force_new: bool,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<DynamicValue>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip)]
    pub validators: Vec<Validator>,
}

/// Value check run on configured attributes
#[derive(Debug, Clone)]
pub enum Validator {
    /// String must be one of the listed values, compared case-sensitively
    StringEnum(&'static [&'static str]),
    /// Integer must fall in `min..=max`
    IntRange {
        min: i64,
        max: i64,
        message: &'static str,
    },
}

impl Validator {
    pub fn validate(&self, key: &str, value: &DynamicValue) -> Result<(), String> {
        match self {
            Validator::StringEnum(allowed) => {
                let s = value.as_string().unwrap_or_default();
                if allowed.contains(&s) {
                    Ok(())
                } else {
                    Err(format!(
                        "expected {} to be one of {:?}, got {}",
                        key, allowed, s
                    ))
                }
            }
            Validator::IntRange { min, max, message } => match value.as_i64() {
                Some(n) if (*min..=*max).contains(&n) => Ok(()),
                _ => Err(message.to_string()),
            },
        }
    }
}

impl Attribute {
    fn new(name: &'static str, kind: AttributeKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            description: String::new(),
            validators: vec![],
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, AttributeKind::String)
    }

    pub fn int(name: &'static str) -> Self {
        Self::new(name, AttributeKind::Int)
    }

    pub fn bool(name: &'static str) -> Self {
        Self::new(name, AttributeKind::Bool)
    }

    pub fn set(name: &'static str, block: Block) -> Self {
        Self::new(name, AttributeKind::Set(block))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn default_value(mut self, value: DynamicValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn validate_with(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    fn kind_matches(&self, value: &DynamicValue) -> bool {
        match (&self.kind, value) {
            (AttributeKind::String, DynamicValue::String(_)) => true,
            (AttributeKind::Int, v) => v.as_i64().is_some(),
            (AttributeKind::Bool, DynamicValue::Bool(_)) => true,
            (AttributeKind::Set(_), DynamicValue::List(_)) => true,
            _ => false,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self.kind {
            AttributeKind::String => "string",
            AttributeKind::Int => "number",
            AttributeKind::Bool => "bool",
            AttributeKind::Set(_) => "set",
        }
    }
}

impl Block {
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self {
            attributes,
            description: String::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Check a configuration against this block
    pub fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        self.validate_at(config, "", &mut diagnostics);
        diagnostics
    }

    fn validate_at(&self, config: &DynamicValue, prefix: &str, out: &mut Vec<Diagnostic>) {
        if let Some(map) = config.as_map() {
            for key in map.keys() {
                if self.attribute(key).is_none() {
                    out.push(Diagnostic::error(
                        "Unsupported argument",
                        format!("An argument named \"{}\" is not expected here", key),
                        Some(format!("{}{}", prefix, key)),
                    ));
                }
            }
        }

        for attr in &self.attributes {
            let path = format!("{}{}", prefix, attr.name);
            let value = match config.get(attr.name) {
                Some(v) => v,
                None => {
                    if attr.required {
                        out.push(Diagnostic::error(
                            "Missing required argument",
                            format!("The argument \"{}\" is required, but no definition was found", attr.name),
                            Some(path),
                        ));
                    }
                    continue;
                }
            };

            if attr.computed && !attr.optional && !attr.required {
                out.push(Diagnostic::error(
                    "Value for unconfigurable attribute",
                    format!("Can't configure a value for \"{}\": its value will be decided automatically", attr.name),
                    Some(path),
                ));
                continue;
            }

            if !attr.kind_matches(value) {
                out.push(Diagnostic::error(
                    "Incorrect attribute value type",
                    format!("Inappropriate value for attribute \"{}\": {} required", attr.name, attr.kind_name()),
                    Some(path),
                ));
                continue;
            }

            for validator in &attr.validators {
                if let Err(detail) = validator.validate(attr.name, value) {
                    out.push(Diagnostic::error("Invalid value", detail, Some(path.clone())));
                }
            }

            if let (AttributeKind::Set(block), Some(items)) = (&attr.kind, value.as_list()) {
                for (i, item) in items.iter().enumerate() {
                    block.validate_at(item, &format!("{}.{}.", path, i), out);
                }
            }
        }
    }

    /// Fill declared defaults for absent attributes, recursively in set elements
    pub fn apply_defaults(&self, config: &DynamicValue) -> DynamicValue {
        let mut out = config.clone();
        if out.is_null() {
            return out;
        }

        for attr in &self.attributes {
            match (&attr.kind, config.get(attr.name)) {
                (_, None) => {
                    if let Some(default) = &attr.default {
                        out.set(attr.name, default.clone());
                    }
                }
                (AttributeKind::Set(block), Some(DynamicValue::List(items))) => {
                    let items = items.iter().map(|item| block.apply_defaults(item)).collect();
                    out.set(attr.name, DynamicValue::List(items));
                }
                _ => {}
            }
        }
        out
    }

    /// Names of force-new attributes whose value differs between two states
    pub fn requires_replace(&self, prior: &DynamicValue, planned: &DynamicValue) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|a| a.force_new)
            .filter(|a| prior.get(a.name) != planned.get(a.name))
            .map(|a| a.name.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{int_value, make_state, string_value};
    use test_case::test_case;

    fn sample() -> Block {
        Block::new(vec![
            Attribute::string("id").computed(),
            Attribute::string("name").required().force_new(),
            Attribute::string("mode")
                .optional()
                .validate_with(Validator::StringEnum(&["a", "b"])),
            Attribute::set(
                "check",
                Block::new(vec![
                    Attribute::int("every")
                        .optional()
                        .default_value(int_value(30))
                        .validate_with(Validator::IntRange { min: 30, max: 3600, message: "out of range" }),
                ]),
            )
            .optional(),
        ])
    }

    #[test_case("a", true ; "first value")]
    #[test_case("b", true ; "second value")]
    #[test_case("A", false ; "case matters")]
    #[test_case("", false ; "empty")]
    fn test_string_enum(value: &str, ok: bool) {
        let v = Validator::StringEnum(&["a", "b"]);
        assert_eq!(v.validate("mode", &string_value(value)).is_ok(), ok);
    }

    #[test_case(29, false ; "below")]
    #[test_case(30, true ; "lower bound")]
    #[test_case(3600, true ; "upper bound")]
    #[test_case(3601, false ; "above")]
    fn test_int_range(value: i64, ok: bool) {
        let v = Validator::IntRange { min: 30, max: 3600, message: "out of range" };
        assert_eq!(v.validate("every", &int_value(value)).is_ok(), ok);
    }

    #[test]
    fn test_missing_required() {
        let diags = sample().validate(&make_state(vec![]));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("name"));
    }

    #[test]
    fn test_nested_path_reported() {
        let config = make_state(vec![
            ("name", string_value("x")),
            ("check", DynamicValue::List(vec![make_state(vec![("every", int_value(5))])])),
        ]);
        let diags = sample().validate(&config);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("check.0.every"));
        assert_eq!(diags[0].detail, "out of range");
    }

    #[test]
    fn test_wrong_type_and_unknown_argument() {
        let config = make_state(vec![
            ("name", int_value(1)),
            ("colour", string_value("red")),
        ]);
        let diags = sample().validate(&config);
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().any(|d| d.summary == "Unsupported argument"));
        assert!(diags.iter().any(|d| d.summary == "Incorrect attribute value type"));
    }

    #[test]
    fn test_computed_only_rejected() {
        let config = make_state(vec![("name", string_value("x")), ("id", string_value("1"))]);
        let diags = sample().validate(&config);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("id"));
    }

    #[test]
    fn test_defaults_fill_nested_blocks() {
        let config = make_state(vec![
            ("name", string_value("x")),
            ("check", DynamicValue::List(vec![make_state(vec![])])),
        ]);
        let planned = sample().apply_defaults(&config);
        let check = &planned.get("check").and_then(|c| c.as_list()).unwrap()[0];
        assert_eq!(check.get("every"), Some(&int_value(30)));
    }

    #[test]
    fn test_requires_replace_only_force_new() {
        let prior = make_state(vec![("name", string_value("x")), ("mode", string_value("a"))]);
        let planned = make_state(vec![("name", string_value("y")), ("mode", string_value("b"))]);
        assert_eq!(sample().requires_replace(&prior, &planned), vec!["name".to_string()]);
        assert!(sample().requires_replace(&prior, &prior).is_empty());
    }
}
