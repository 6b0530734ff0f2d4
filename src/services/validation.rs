//! Field-scoped validation primitives shared by the user service.
//!
//! Each parser looks at a single JSON value and either returns the cleaned
//! value or the list of messages for that field. Callers collect the messages
//! into a [`FieldErrors`] map so a response can report every bad field at once.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use validator::ValidateEmail;

pub const REQUIRED: &str = "This field is required.";
pub const NULL: &str = "This field may not be null.";
pub const BLANK: &str = "This field may not be blank.";
pub const INVALID_STRING: &str = "Not a valid string.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_BOOLEAN: &str = "Must be a valid boolean.";

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Messages keyed by field name, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn extend(&mut self, field: &str, messages: Vec<String>) {
        for message in messages {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Constraints for a text field.
#[derive(Debug, Clone, Copy)]
pub struct CharRules {
    pub max_length: Option<usize>,
    pub min_length: Option<usize>,
    pub allow_blank: bool,
    pub allow_null: bool,
    pub email: bool,
}

impl CharRules {
    pub const fn required(max_length: usize) -> Self {
        Self {
            max_length: Some(max_length),
            min_length: None,
            allow_blank: false,
            allow_null: false,
            email: false,
        }
    }

    pub const fn optional(max_length: usize) -> Self {
        Self {
            max_length: Some(max_length),
            min_length: None,
            allow_blank: true,
            allow_null: true,
            email: false,
        }
    }

    pub const fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub const fn email(mut self) -> Self {
        self.email = true;
        self
    }
}

/// Validates a text value. `Ok(None)` is an accepted null.
///
/// Surrounding whitespace is trimmed before the blank and length checks.
/// Numbers are accepted and converted to their textual form; booleans,
/// arrays and objects are rejected.
pub fn parse_char(value: &Value, rules: &CharRules) -> Result<Option<String>, Vec<String>> {
    let raw = match value {
        Value::Null if rules.allow_null => return Ok(None),
        Value::Null => return Err(vec![NULL.to_string()]),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            return Err(vec![INVALID_STRING.to_string()])
        }
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return if rules.allow_blank {
            Ok(Some(String::new()))
        } else {
            Err(vec![BLANK.to_string()])
        };
    }

    let mut messages = Vec::new();
    let length = trimmed.chars().count();

    if let Some(max) = rules.max_length {
        if length > max {
            messages.push(format!(
                "Ensure this field has no more than {} characters.",
                max
            ));
        }
    }
    if let Some(min) = rules.min_length {
        if length < min {
            messages.push(format!("Ensure this field has at least {} characters.", min));
        }
    }
    if rules.email && !is_valid_email(trimmed) {
        messages.push(INVALID_EMAIL.to_string());
    }

    if messages.is_empty() {
        Ok(Some(trimmed.to_string()))
    } else {
        Err(messages)
    }
}

/// Validates a boolean value, accepting the usual textual and numeric spellings.
pub fn parse_bool(value: &Value) -> Result<bool, Vec<String>> {
    let parsed = match value {
        Value::Null => return Err(vec![NULL.to_string()]),
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v == 1.0 => Some(true),
            Some(v) if v == 0.0 => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
            _ => None,
        },
        Value::Array(_) | Value::Object(_) => None,
    };

    parsed.ok_or_else(|| vec![INVALID_BOOLEAN.to_string()])
}

pub fn is_valid_email(value: &str) -> bool {
    value.validate_email()
}

/// Request bodies must be JSON objects.
pub fn expect_object(data: &Value) -> Result<&Map<String, Value>, FieldErrors> {
    data.as_object().ok_or_else(|| {
        FieldErrors::single(
            NON_FIELD_ERRORS,
            format!(
                "Invalid data. Expected a dictionary, but got {}.",
                json_type_name(data)
            ),
        )
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
