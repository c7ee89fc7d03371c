use crate::error::{DomError, DomResult};
use crate::format::Format;
use serde_json::{Map, Number, Value};
use std::fs;
use std::path::Path;

/// Reads a local file as raw bytes.
pub fn read_file<P: AsRef<Path>>(path: P) -> DomResult<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| DomError::Io(format!("failed to read {}: {}", path.display(), e)))
}

/// Decodes UTF-8 input, dropping a leading byte-order mark.
pub fn decode(bytes: &[u8]) -> DomResult<&str> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DomError::malformed(format!("input is not valid UTF-8: {}", e)))?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

/// Parses JSON or YAML text into a JSON value tree.
///
/// - YAML mappings keep their key order, and non-string keys (`200:`) become strings.
/// - On error, includes `origin` and (when available) line/column in the message.
pub fn parse_value(text: &str, format: Format, origin: Option<&str>) -> DomResult<Value> {
    if text.trim().is_empty() {
        return Err(DomError::malformed(format!("{} is empty", origin.unwrap_or("input"))));
    }
    let origin = origin.map(|o| format!(" in {}", o)).unwrap_or_default();

    match format {
        Format::Json => serde_json::from_str::<Value>(text).map_err(|err| {
            DomError::malformed(format!(
                "JSON parse error at {}:{}{}: {}",
                err.line(),
                err.column(),
                origin,
                err
            ))
        }),
        Format::Yaml => match serde_yaml::from_str::<serde_yaml::Value>(text) {
            Ok(value) => Ok(yaml_to_json(value)),
            Err(err) => {
                if let Some(loc) = err.location() {
                    Err(DomError::malformed(format!(
                        "YAML parse error at {}:{}{}: {}",
                        loc.line(),
                        loc.column(),
                        origin,
                        err
                    )))
                } else {
                    Err(DomError::malformed(format!("YAML parse error{}: {}", origin, err)))
                }
            }
        },
    }
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => yaml_number(&n),
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(yaml_key(key), yaml_to_json(value));
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(u) = n.as_u64() {
        Value::Number(u.into())
    } else if let Some(i) = n.as_i64() {
        Value::Number(i.into())
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(n.to_string()))
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_valid_yaml_with_numeric_keys() {
        let value = parse_value(
            "responses:\n  200:\n    description: ok\n  default:\n    description: err\n",
            Format::Yaml,
            None,
        )
        .expect("should parse valid YAML");
        let responses = value["responses"].as_object().unwrap();
        assert_eq!(responses.keys().collect::<Vec<_>>(), vec!["200", "default"]);
    }

    #[test]
    fn test_invalid_yaml_has_origin_and_line() {
        let err = parse_value("a: [1, 2\nb: 2", Format::Yaml, Some("petstore.yaml")).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, DomError::MalformedContent(_)));
        assert!(msg.contains("petstore.yaml"));
        assert!(msg.contains("YAML parse error"));
    }

    #[test]
    fn test_invalid_json_reports_position() {
        let err = parse_value("{\"openapi\": }", Format::Json, None).unwrap_err();
        assert!(err.to_string().contains("JSON parse error at 1:"));
    }

    #[test]
    fn test_bom_and_invalid_utf8() {
        assert_eq!(decode("\u{feff}openapi: 3.0.1".as_bytes()).unwrap(), "openapi: 3.0.1");
        assert!(matches!(decode(&[0xff, 0xfe, 0x00]), Err(DomError::MalformedContent(_))));
    }

    #[test]
    fn test_read_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "openapi: 3.0.1").unwrap();
        let bytes = read_file(file.path()).unwrap();
        assert!(decode(&bytes).unwrap().starts_with("openapi"));
        assert!(matches!(read_file("/definitely/not/here.yaml"), Err(DomError::Io(_))));
    }

    #[test]
    fn test_empty_input_is_malformed() {
        assert!(matches!(
            parse_value("  \n", Format::Yaml, None),
            Err(DomError::MalformedContent(_))
        ));
    }
}
