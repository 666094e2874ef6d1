use serde_json::{Map, Value};

/// Document-store-safe key for a display name: everything outside
/// `[A-Za-z0-9_-]` becomes `_`.
pub fn sanitize_key(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

/// Drops null fields and flattens nested objects into `parent_child` keys.
/// Arrays are kept as they are.
pub fn sanitize_item(item: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    flatten_into(&mut out, None, item);
    out
}

fn flatten_into(out: &mut Map<String, Value>, prefix: Option<&str>, item: &Map<String, Value>) {
    for (field, value) in item {
        let key = match prefix {
            Some(prefix) => format!("{}_{}", prefix, field),
            None => field.clone(),
        };
        match value {
            Value::Null => {}
            Value::Object(nested) => flatten_into(out, Some(&key), nested),
            other => {
                out.insert(key, other.clone());
            }
        }
    }
}

/// Reads an identifier field that the platform may return as string or number.
pub fn id_field(item: &Map<String, Value>, field: &str) -> Option<String> {
    match item.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replaces_unsafe_characters() {
        assert_eq!(sanitize_key("Acme Co"), "Acme_Co");
        assert_eq!(sanitize_key("Spring/Sale #2 (BR)"), "Spring_Sale__2__BR_");
        assert_eq!(sanitize_key("promo-2024_v1"), "promo-2024_v1");
        assert_eq!(sanitize_key("Café"), "Caf_");
    }

    #[test]
    fn sanitizing_is_idempotent() {
        for name in ["Acme Co", "a.b/c", "ok_name-1", "Ünïcødé ✓"] {
            let once = sanitize_key(name);
            assert_eq!(sanitize_key(&once), once);
        }
    }

    #[test]
    fn drops_nulls_and_flattens_objects() {
        let item = json!({
            "id": "act_1",
            "name": "Main",
            "balance": null,
            "business": {"id": "9", "name": "Acme", "extra": null},
            "tags": [1, null, {"a": 1}]
        });
        let clean = sanitize_item(item.as_object().unwrap());
        assert_eq!(
            Value::Object(clean),
            json!({
                "id": "act_1",
                "name": "Main",
                "business_id": "9",
                "business_name": "Acme",
                "tags": [1, null, {"a": 1}]
            })
        );
    }

    #[test]
    fn reads_numeric_ids() {
        let item = json!({"id": 42, "name": "", "other": "x"});
        let map = item.as_object().unwrap();
        assert_eq!(id_field(map, "id").as_deref(), Some("42"));
        assert_eq!(id_field(map, "name"), None);
        assert_eq!(id_field(map, "missing"), None);
    }
}
