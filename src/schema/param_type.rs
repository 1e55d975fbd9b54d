use crate::error::ConversionError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

/// The declared type of a schema param.
///
/// Names follow the console's wire format (`"array-object"`, `"number"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    File,
    ArrayString,
    ArrayInteger,
    ArrayNumber,
    ArrayBoolean,
    ArrayObject,
}

impl ParamType {
    pub const ALL: [ParamType; 11] = [
        ParamType::String,
        ParamType::Integer,
        ParamType::Number,
        ParamType::Boolean,
        ParamType::Object,
        ParamType::File,
        ParamType::ArrayString,
        ParamType::ArrayInteger,
        ParamType::ArrayNumber,
        ParamType::ArrayBoolean,
        ParamType::ArrayObject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::File => "file",
            ParamType::ArrayString => "array-string",
            ParamType::ArrayInteger => "array-integer",
            ParamType::ArrayNumber => "array-number",
            ParamType::ArrayBoolean => "array-boolean",
            ParamType::ArrayObject => "array-object",
        }
    }

    /// Container types are the only ones allowed to hold children.
    pub fn is_container(&self) -> bool {
        matches!(self, ParamType::Object | ParamType::ArrayObject)
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            ParamType::ArrayString
                | ParamType::ArrayInteger
                | ParamType::ArrayNumber
                | ParamType::ArrayBoolean
                | ParamType::ArrayObject
        )
    }

    /// The type of one element of an array type; non-array types map to themselves.
    pub fn element_type(&self) -> ParamType {
        match self {
            ParamType::ArrayString => ParamType::String,
            ParamType::ArrayInteger => ParamType::Integer,
            ParamType::ArrayNumber => ParamType::Number,
            ParamType::ArrayBoolean => ParamType::Boolean,
            ParamType::ArrayObject => ParamType::Object,
            other => *other,
        }
    }

    /// The default value a param of this type is reset to after a type change.
    /// Containers carry no scalar default.
    pub fn default_value(&self) -> Value {
        match self {
            ParamType::String | ParamType::File => json!(""),
            ParamType::Integer | ParamType::Number => json!(0),
            ParamType::Boolean => json!(false),
            ParamType::ArrayString
            | ParamType::ArrayInteger
            | ParamType::ArrayNumber
            | ParamType::ArrayBoolean => json!([]),
            ParamType::Object | ParamType::ArrayObject => Value::Null,
        }
    }

    /// Human-readable label, e.g. `Array<Number>`.
    pub fn display_name(&self) -> String {
        if self.is_array() {
            format!("Array<{}>", capitalize(self.element_type().as_str()))
        } else {
            capitalize(self.as_str())
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ParamType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| ConversionError::UnknownParamType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for t in ParamType::ALL {
            assert_eq!(t.as_str().parse::<ParamType>().unwrap(), t);
        }
        assert!("array".parse::<ParamType>().is_err());
    }

    #[test]
    fn serde_uses_kebab_case_names() {
        let json = serde_json::to_string(&ParamType::ArrayObject).unwrap();
        assert_eq!(json, "\"array-object\"");
    }

    #[test]
    fn display_name_wraps_arrays() {
        assert_eq!(ParamType::ArrayNumber.display_name(), "Array<Number>");
        assert_eq!(ParamType::Boolean.display_name(), "Boolean");
    }
}
