// ── Resource representation ──
//
// Resources are opaque JSON objects: the controller never interprets
// their shape beyond the HAL `_links.self.href` member that carries the
// canonical identity URL.

use serde_json::Value;
use url::Url;

/// An opaque, serializable resource record.
///
/// Both the server snapshot and the local draft are `Body` values; edits
/// merge shallowly per top-level key, so nested structures must be
/// replaced wholesale by the caller.
pub type Body = serde_json::Map<String, Value>;

/// Extract the canonical URL of a resource from its `_links.self.href`
/// member, when the backend provides one.
pub fn self_url(body: &Body) -> Option<Url> {
    let href = body
        .get("_links")?
        .get("self")?
        .get("href")?
        .as_str()?;
    Url::parse(href).ok()
}

/// Merge `partial` into `draft`, replacing whole values per top-level key.
pub(crate) fn merge_into(draft: &mut Body, partial: &Body) {
    for (key, value) in partial {
        draft.insert(key.clone(), value.clone());
    }
}

/// Look up a dotted field path (`"address.city"`) inside a resource body.
pub(crate) fn field<'a>(body: &'a Body, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = body.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Body {
        value.as_object().expect("test body is an object").clone()
    }

    #[test]
    fn self_url_reads_hal_link() {
        let b = body(json!({
            "name": "Ada",
            "_links": { "self": { "href": "https://api.example.com/customers/1" } }
        }));
        assert_eq!(
            self_url(&b).expect("href present").as_str(),
            "https://api.example.com/customers/1"
        );
    }

    #[test]
    fn self_url_absent_or_invalid_is_none() {
        assert!(self_url(&body(json!({ "name": "Ada" }))).is_none());
        let b = body(json!({ "_links": { "self": { "href": "not a url" } } }));
        assert!(self_url(&b).is_none());
    }

    #[test]
    fn merge_replaces_whole_top_level_values() {
        let mut draft = body(json!({ "name": "Ada", "address": { "city": "London" } }));
        let partial = body(json!({ "address": { "zip": "12345" } }));
        merge_into(&mut draft, &partial);

        // Nested structures are replaced, not deep-merged.
        assert_eq!(draft["address"], json!({ "zip": "12345" }));
        assert_eq!(draft["name"], "Ada");
    }

    #[test]
    fn field_traverses_dotted_paths() {
        let b = body(json!({ "address": { "city": "London" } }));
        assert_eq!(field(&b, "address.city"), Some(&json!("London")));
        assert_eq!(field(&b, "address.zip"), None);
        assert_eq!(field(&b, "name"), None);
    }
}
