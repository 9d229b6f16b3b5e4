//! Default-header merge (spec §4.1.7).

use http::{HeaderMap, HeaderName, HeaderValue};

/// Merges `caller`, `defaults`, and `defaults_by_method` into the header
/// set the transport actually sees.
///
/// Precedence, highest first: `caller`, then `defaults_by_method`, then
/// `defaults`. An empty header value is treated as an explicit deletion
/// (the key is dropped from the merged result even if a lower-precedence
/// layer set it). Values are not naively concatenated: a key present at a
/// higher precedence replaces, rather than extends, a lower one.
pub fn merge_headers(caller: &HeaderMap, defaults: &HeaderMap, defaults_by_method: &HeaderMap) -> HeaderMap {
    let mut merged = HeaderMap::new();
    let mut deleted = std::collections::HashSet::new();

    for (name, value) in defaults.iter() {
        apply(&mut merged, &mut deleted, name.clone(), value.clone());
    }
    for (name, value) in defaults_by_method.iter() {
        apply(&mut merged, &mut deleted, name.clone(), value.clone());
    }
    for (name, value) in caller.iter() {
        apply(&mut merged, &mut deleted, name.clone(), value.clone());
    }

    merged
}

fn apply(
    merged: &mut HeaderMap,
    deleted: &mut std::collections::HashSet<HeaderName>,
    name: HeaderName,
    value: HeaderValue,
) {
    if value.is_empty() {
        merged.remove(&name);
        deleted.insert(name);
        return;
    }
    deleted.remove(&name);
    merged.insert(name, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(HeaderName::try_from(*k).unwrap(), HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn caller_headers_override_defaults() {
        let caller = headers(&[("x-api-key", "caller")]);
        let defaults = headers(&[("x-api-key", "default"), ("accept", "application/json")]);
        let merged = merge_headers(&caller, &defaults, &HeaderMap::new());
        assert_eq!(merged.get("x-api-key").unwrap(), "caller");
        assert_eq!(merged.get("accept").unwrap(), "application/json");
    }

    #[test]
    fn empty_value_deletes_a_lower_precedence_header() {
        let caller = headers(&[("x-tracing", "")]);
        let defaults = headers(&[("x-tracing", "on")]);
        let merged = merge_headers(&caller, &defaults, &HeaderMap::new());
        assert!(merged.get("x-tracing").is_none());
    }

    #[test]
    fn per_method_defaults_take_precedence_over_general_defaults() {
        let defaults = headers(&[("content-type", "text/plain")]);
        let by_method = headers(&[("content-type", "application/json")]);
        let merged = merge_headers(&HeaderMap::new(), &defaults, &by_method);
        assert_eq!(merged.get("content-type").unwrap(), "application/json");
    }
}
