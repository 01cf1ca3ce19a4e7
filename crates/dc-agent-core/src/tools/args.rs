//! Decoding of model-produced tool arguments.
//!
//! Some model endpoints occasionally emit two argument objects back to back
//! (`{"a":1}{"a":2}`) or wrap the object in stray text. The parser recovers
//! the intended object where it can, preferring the last complete object for
//! concatenations.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unable to parse tool arguments: {raw}")]
pub struct ArgumentParseError {
    pub raw: String,
}

pub type Arguments = Map<String, Value>;

/// Decode an argument payload that is already JSON. Objects pass through,
/// `null` means no arguments, strings are decoded with [`parse_tool_arguments`].
pub fn parse_tool_argument_value(value: &Value) -> Result<Arguments, ArgumentParseError> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        Value::String(raw) => parse_tool_arguments(raw),
        other => Err(ArgumentParseError {
            raw: other.to_string(),
        }),
    }
}

pub fn parse_tool_arguments(raw: &str) -> Result<Arguments, ArgumentParseError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Ok(Map::new());
    }

    if let Some(args) = parse_object(trimmed) {
        return Ok(args);
    }

    if trimmed.contains("}{") {
        if let Some(args) = last_concatenated_object(trimmed) {
            log::warn!("Recovered tool arguments from trailing concatenated object");
            return Ok(args);
        }

        if let Some(args) = last_array_element(trimmed) {
            log::warn!("Recovered tool arguments from concatenated object list");
            return Ok(args);
        }
    }

    if let Some(args) = first_balanced_object(trimmed) {
        log::warn!("Recovered tool arguments from first balanced object");
        return Ok(args);
    }

    Err(ArgumentParseError {
        raw: raw.to_string(),
    })
}

fn parse_object(candidate: &str) -> Option<Arguments> {
    match serde_json::from_str::<Value>(candidate).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn last_concatenated_object(s: &str) -> Option<Arguments> {
    let tail = s.rsplit("}{").next()?;
    parse_object(&format!("{{{tail}"))
}

fn last_array_element(s: &str) -> Option<Arguments> {
    let wrapped = format!("[{}]", s.replace("}{", "},{"));
    match serde_json::from_str::<Value>(&wrapped).ok()? {
        Value::Array(mut items) => match items.pop()? {
            Value::Object(map) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

// String contents are not tracked; a brace inside a string literal can end
// the scan early, in which case the parse below simply fails.
fn first_balanced_object(s: &str) -> Option<Arguments> {
    let start = s.find('{')?;
    let mut depth = 0usize;

    for (offset, ch) in s[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return parse_object(&s[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn obj(value: Value) -> Arguments {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn parses_single_object() {
        assert_eq!(parse_tool_arguments(r#"{"a":1}"#).unwrap(), obj(json!({"a": 1})));
    }

    #[test]
    fn concatenated_objects_take_last() {
        assert_eq!(
            parse_tool_arguments(r#"{"a":1}{"a":2}"#).unwrap(),
            obj(json!({"a": 2}))
        );
    }

    #[test]
    fn concatenated_nested_objects_take_last() {
        let raw = r#"{"team":"KC"}{"filters":{"down":3}}{"season":2024}"#;
        assert_eq!(
            parse_tool_arguments(raw).unwrap(),
            obj(json!({"season": 2024}))
        );

        let nested_last = r#"{"a":1}{"f":{"x":1}}"#;
        assert_eq!(
            parse_tool_arguments(nested_last).unwrap(),
            obj(json!({"f": {"x": 1}}))
        );
    }

    #[test]
    fn trailing_noise_after_concatenation_uses_first_object() {
        assert_eq!(
            parse_tool_arguments(r#"{"a":1}{"a":2} done"#).unwrap(),
            obj(json!({"a": 1}))
        );
    }

    #[test]
    fn leading_noise_uses_first_balanced_object() {
        assert_eq!(
            parse_tool_arguments(r#"args: {"team":"SF","season":2023} trailing"#).unwrap(),
            obj(json!({"team": "SF", "season": 2023}))
        );
    }

    #[test]
    fn garbage_fails_with_raw_payload() {
        let error = parse_tool_arguments("not json").unwrap_err();
        assert_eq!(error.raw, "not json");
    }

    #[test]
    fn unbalanced_object_fails() {
        assert!(parse_tool_arguments(r#"{"team":"KC""#).is_err());
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(parse_tool_arguments("[1,2]").is_err());
        assert!(parse_tool_arguments("42").is_err());
    }

    #[test]
    fn blank_input_means_no_arguments() {
        assert!(parse_tool_arguments("").unwrap().is_empty());
        assert!(parse_tool_arguments("   ").unwrap().is_empty());
    }

    #[test]
    fn whitespace_around_object_is_ignored() {
        assert_eq!(
            parse_tool_arguments("  {\"a\":1}\n").unwrap(),
            obj(json!({"a": 1}))
        );
    }

    #[test]
    fn value_input_passes_objects_through() {
        let value = json!({"team": "DAL"});
        assert_eq!(
            parse_tool_argument_value(&value).unwrap(),
            obj(json!({"team": "DAL"}))
        );
        assert!(parse_tool_argument_value(&Value::Null).unwrap().is_empty());
        assert_eq!(
            parse_tool_argument_value(&json!(r#"{"a":1}{"a":2}"#)).unwrap(),
            obj(json!({"a": 2}))
        );
        assert!(parse_tool_argument_value(&json!(5)).is_err());
    }
}
