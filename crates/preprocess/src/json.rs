use serde_json::{Deserializer, Map, Value};

/// Find the first complete JSON object embedded in free-form model output.
///
/// Every `{` is tried as a starting point in order; the first one that
/// deserializes into an object wins. Text after the object is ignored, so
/// leading prose, trailing prose and code fences all fall away.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    for (start, _) in text.match_indices('{') {
        let mut stream = Deserializer::from_str(&text[start..]).into_iter::<Value>();

        if let Some(Ok(Value::Object(map))) = stream.next() {
            return Some(map);
        }
    }

    None
}
