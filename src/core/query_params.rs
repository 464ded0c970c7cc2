use std::collections::HashMap;

/// Parse query parameters from a URI string
///
/// Handles URL decoding (including `+` as space, as browsers encode form
/// queries) and returns a HashMap of parameter key-value pairs.
/// Multiple values for the same key are not supported (only the last is kept).
///
/// # Example
/// ```
/// use alkabeta::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/users/search?q=ali%20ce&x");
/// assert_eq!(params.get("q"), Some(&"ali ce".to_string()));
/// assert_eq!(params.get("x"), Some(&String::new()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    let Some((_, query)) = uri.split_once('?') else {
        return params;
    };

    for param in query.split('&').filter(|p| !p.is_empty()) {
        match param.split_once('=') {
            Some((key, encoded_value)) => {
                params.insert(decode(key), decode(encoded_value));
            }
            // Flag parameter without value
            None => {
                params.insert(decode(param), String::new());
            }
        }
    }

    params
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Get a string parameter, treating empty values as absent
pub fn get_non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_query_yields_empty_map() {
        assert!(parse_query_params("/users/search").is_empty());
    }

    #[test]
    fn decodes_percent_and_plus() {
        let params = parse_query_params("/users/search?q=Jos%C3%A9+Luis&sort=popular");
        assert_eq!(params["q"], "José Luis");
        assert_eq!(params["sort"], "popular");
    }

    #[test]
    fn empty_values_are_treated_as_missing() {
        let params = parse_query_params("/users/search?q=&other=%20");
        assert_eq!(get_non_empty(&params, "q"), None);
        assert_eq!(get_non_empty(&params, "other"), Some(" "));
        assert_eq!(get_non_empty(&params, "missing"), None);
    }
}
