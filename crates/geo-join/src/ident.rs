use serde_json::Value;

/// Normalize a raw join-key property into the canonical string form used
/// against the backend. Absent, null, and whitespace-only values all come
/// back as `None`, which blocks any fetch for that feature.
pub fn normalize_id(raw: Option<&Value>) -> Option<String> {
    let value = raw?;
    let s = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Arrays/objects make no sense as join keys.
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_and_null_block() {
        assert_eq!(normalize_id(None), None);
        assert_eq!(normalize_id(Some(&Value::Null)), None);
    }

    #[test]
    fn test_strings_trimmed() {
        assert_eq!(normalize_id(Some(&json!("  42 "))), Some("42".to_string()));
        assert_eq!(normalize_id(Some(&json!("FR-75"))), Some("FR-75".to_string()));
    }

    #[test]
    fn test_blank_string_blocks() {
        assert_eq!(normalize_id(Some(&json!(""))), None);
        assert_eq!(normalize_id(Some(&json!("   "))), None);
    }

    #[test]
    fn test_numbers_stringified() {
        assert_eq!(normalize_id(Some(&json!(42))), Some("42".to_string()));
        assert_eq!(normalize_id(Some(&json!(7.5))), Some("7.5".to_string()));
    }

    #[test]
    fn test_composite_values_block() {
        assert_eq!(normalize_id(Some(&json!([1, 2]))), None);
        assert_eq!(normalize_id(Some(&json!({"a": 1}))), None);
    }
}
