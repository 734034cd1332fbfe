//! Upstream sources wrap their item lists in different envelopes. Each extractor
//! recognises one shape; they are tried in order and the first match wins.

use serde_json::Value;

pub type Extractor = fn(&Value) -> Option<&Vec<Value>>;

fn bare_array(value: &Value) -> Option<&Vec<Value>> {
    value.as_array()
}

fn results(value: &Value) -> Option<&Vec<Value>> {
    value.get("results")?.as_array()
}

fn posts(value: &Value) -> Option<&Vec<Value>> {
    value.get("posts")?.as_array()
}

fn videos(value: &Value) -> Option<&Vec<Value>> {
    value.get("videos")?.as_array()
}

fn data(value: &Value) -> Option<&Vec<Value>> {
    value.get("data")?.as_array()
}

pub const EXTRACTORS: &[(&str, Extractor)] = &[
    ("array", bare_array),
    ("results", results),
    ("posts", posts),
    ("videos", videos),
    ("data", data),
];

/// Name of the first envelope shape `value` matches.
pub fn envelope_kind(value: &Value) -> Option<&'static str> {
    EXTRACTORS
        .iter()
        .find(|(_, extract)| extract(value).is_some())
        .map(|(name, _)| *name)
}

/// Items from the first matching envelope, or nothing.
pub fn extract_items(value: &Value) -> &[Value] {
    EXTRACTORS
        .iter()
        .find_map(|(_, extract)| extract(value))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items() -> Value {
        json!([{"title": "one"}, {"title": "two"}])
    }

    #[test]
    fn every_envelope_yields_the_same_items() {
        let shapes = [
            items(),
            json!({ "results": items() }),
            json!({ "posts": items() }),
            json!({ "videos": items() }),
            json!({ "data": items() }),
        ];
        for shape in &shapes {
            assert_eq!(extract_items(shape), items().as_array().unwrap().as_slice());
        }
    }

    #[test]
    fn first_array_field_wins() {
        let value = json!({ "data": [{"title": "d"}], "results": [{"title": "r"}] });
        assert_eq!(envelope_kind(&value), Some("results"));
        assert_eq!(extract_items(&value)[0]["title"], "r");
    }

    #[test]
    fn non_array_fields_are_skipped() {
        let value = json!({ "results": {"count": 0}, "posts": "none", "videos": [{"title": "v"}] });
        assert_eq!(envelope_kind(&value), Some("videos"));
        assert_eq!(extract_items(&value).len(), 1);
    }

    #[test]
    fn unknown_shapes_are_empty() {
        assert!(extract_items(&json!({"items": []})).is_empty());
        assert!(extract_items(&json!(null)).is_empty());
        assert_eq!(envelope_kind(&json!("text")), None);
    }
}
