use regex::Regex;
use serde::{de, Deserialize, Deserializer};
use std::sync::OnceLock;

use crate::error::FieldErrors;

pub const MAX_LEN_USERNAME: usize = 30;
pub const MAX_LEN_FULL_NAME: usize = 50;
pub const MAX_LEN_BIO: usize = 150;
pub const MAX_LEN_WORKOUT_NAME: usize = 50;
pub const MAX_LEN_EXERCISE_NAME: usize = 50;
pub const MAX_LEN_PLAN_NAME: usize = 100;

fn username_regex() -> &'static Regex {
    static USERNAME: OnceLock<Regex> = OnceLock::new();
    USERNAME.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("static regex"))
}

/// Lowercased, trimmed username or the field errors explaining why not.
pub fn normalize_username(raw: &str) -> Result<String, FieldErrors> {
    let username = raw.trim().to_lowercase();
    let mut errors = FieldErrors::new();

    if username.is_empty() {
        errors.add("username", "This field may not be blank.");
    } else if username.chars().count() > MAX_LEN_USERNAME {
        errors.add(
            "username",
            format!("Ensure this field has no more than {} characters.", MAX_LEN_USERNAME),
        );
    } else if !username_regex().is_match(&username) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }

    if errors.is_empty() {
        Ok(username)
    } else {
        Err(errors)
    }
}

/// Checks a trimmed name against a maximum length.
pub fn check_name(field: &str, name: &str, max_len: usize, blank_message: &str) -> Result<String, FieldErrors> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FieldErrors::single(field, blank_message));
    }
    if name.chars().count() > max_len {
        return Err(FieldErrors::single(
            field,
            format!("Ensure this field has no more than {} characters.", max_len),
        ));
    }
    Ok(name.to_string())
}

/// Numbers as clients send them: JSON numbers, numeric strings, comma decimals.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl LenientNumber {
    fn into_f64(self) -> Result<Option<f64>, String> {
        match self {
            LenientNumber::Int(value) => Ok(Some(value as f64)),
            LenientNumber::Float(value) => Ok(Some(value)),
            LenientNumber::Text(text) => parse_decimal(&text),
        }
    }

    fn into_i32(self) -> Result<Option<i32>, String> {
        let value = match self {
            LenientNumber::Int(value) => return i32::try_from(value).map(Some).map_err(|e| e.to_string()),
            LenientNumber::Float(value) => value,
            LenientNumber::Text(text) => match parse_decimal(&text)? {
                Some(value) => value,
                None => return Ok(None),
            },
        };

        if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
            return Err(format!("{} is not a valid integer", value));
        }
        Ok(Some(value as i32))
    }
}

pub fn parse_decimal(text: &str) -> Result<Option<f64>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.replace(',', ".")
        .parse::<f64>()
        .map(Some)
        .map_err(|_| format!("'{}' is not a valid number", text))
}

pub fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<LenientNumber>::deserialize(deserializer)? {
        Some(number) => number.into_f64().map_err(de::Error::custom),
        None => Ok(None),
    }
}

pub fn opt_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    match Option::<LenientNumber>::deserialize(deserializer)? {
        Some(number) => number.into_i32().map_err(de::Error::custom),
        None => Ok(None),
    }
}

pub fn i32_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    opt_i32(deserializer).map(|value| value.unwrap_or(0))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientBool {
    Bool(bool),
    Int(i64),
    Text(String),
}

pub fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Option::<LenientBool>::deserialize(deserializer)? {
        None => Ok(false),
        Some(LenientBool::Bool(value)) => Ok(value),
        Some(LenientBool::Int(value)) => Ok(value != 0),
        Some(LenientBool::Text(text)) => match text.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" | "" => Ok(false),
            other => Err(de::Error::custom(format!("'{}' is not a valid boolean", other))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "opt_f64")]
        weight: Option<f64>,
        #[serde(default, deserialize_with = "opt_i32")]
        reps: Option<i32>,
        #[serde(default, deserialize_with = "flexible_bool")]
        bodyweight: bool,
    }

    fn sample(json: &str) -> Sample {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_lenient_numbers() {
        let s = sample(r#"{"weight": "82,5", "reps": "8", "bodyweight": "false"}"#);
        assert_eq!(s.weight, Some(82.5));
        assert_eq!(s.reps, Some(8));
        assert!(!s.bodyweight);

        let s = sample(r#"{"weight": 100, "reps": 5.0, "bodyweight": true}"#);
        assert_eq!(s.weight, Some(100.0));
        assert_eq!(s.reps, Some(5));
        assert!(s.bodyweight);

        let s = sample(r#"{"weight": "", "reps": null}"#);
        assert_eq!(s.weight, None);
        assert_eq!(s.reps, None);
        assert!(!s.bodyweight);
    }

    #[test]
    fn test_lenient_numbers_reject_garbage() {
        assert!(serde_json::from_str::<Sample>(r#"{"weight": "heavy"}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"reps": 2.5}"#).is_err());
    }

    #[test]
    fn test_username_normalization() {
        assert_eq!(normalize_username(" Arnold.S ").unwrap(), "arnold.s");
        assert!(normalize_username("").is_err());
        assert!(normalize_username("has space").is_err());
        assert!(normalize_username(&"a".repeat(31)).is_err());
    }

    #[test]
    fn test_check_name() {
        assert_eq!(check_name("name", "  Push day ", 50, "blank").unwrap(), "Push day");
        let err = check_name("name", "   ", 50, "Provide a name for your workout").unwrap_err();
        assert_eq!(err.get("name"), Some(&["Provide a name for your workout".to_string()][..]));
        assert!(check_name("name", &"x".repeat(51), 50, "blank").is_err());
    }
}
