//! CSRF token acquisition
//!
//! Double-submit cookie: the token travels both as the `csrftoken` cookie and as the
//! `X-CSRFToken` header on every mutating request.

use regex::Regex;

pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_FORM_FIELD: &str = "csrfmiddlewaretoken";

/// Extract the token from a `Cookie` header value such as `sessionid=x; csrftoken=y`
pub fn token_from_cookie_header(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim() == CSRF_COOKIE)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Extract the token from an embedded `<input name="csrfmiddlewaretoken" value="...">`
pub fn token_from_html(html: &str) -> Option<String> {
    let input_re = Regex::new(r"(?is)<input\b[^>]*>").ok()?;
    let name_re = Regex::new(&format!(
        r#"(?i)\sname\s*=\s*["']?{}["'\s/>]"#,
        CSRF_FORM_FIELD
    ))
    .ok()?;
    let value_re =
        Regex::new(r#"(?i)\svalue\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'<>/=`]+))"#).ok()?;

    let token = input_re
        .find_iter(html)
        .map(|tag| tag.as_str())
        .filter(|tag| name_re.is_match(tag))
        .filter_map(|tag| value_re.captures(tag))
        .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)).or_else(|| cap.get(3)))
        .map(|value| value.as_str().to_string())
        .find(|value| !value.is_empty());
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_cookie_header() {
        assert_eq!(
            token_from_cookie_header("sessionid=abc; csrftoken=XyZ123"),
            Some("XyZ123".to_string())
        );
        assert_eq!(
            token_from_cookie_header("csrftoken=tok"),
            Some("tok".to_string())
        );
        assert_eq!(token_from_cookie_header("sessionid=abc"), None);
        assert_eq!(token_from_cookie_header("csrftoken="), None);
        assert_eq!(token_from_cookie_header("xcsrftoken=nope"), None);
    }

    #[test]
    fn test_token_from_html_form_field() {
        let html = r#"<form method="post"><input type="hidden" name="csrfmiddlewaretoken" value="k9Jd2"></form>"#;
        assert_eq!(token_from_html(html), Some("k9Jd2".to_string()));
    }

    #[test]
    fn test_token_from_html_value_before_name() {
        let html = r#"<input value='abc' type="hidden" name='csrfmiddlewaretoken' />"#;
        assert_eq!(token_from_html(html), Some("abc".to_string()));
    }

    #[test]
    fn test_token_from_html_skips_other_inputs() {
        let html = r#"<input type="text" name="username" value="ana">
            <input data-value="decoy" type=hidden name=csrfmiddlewaretoken value=Plain42>"#;
        assert_eq!(token_from_html(html), Some("Plain42".to_string()));
    }

    #[test]
    fn test_token_from_html_missing() {
        assert_eq!(token_from_html("<html><body>login</body></html>"), None);
        assert_eq!(
            token_from_html(r#"<input name="csrfmiddlewaretoken">"#),
            None
        );
        assert_eq!(
            token_from_html(r#"<input name="csrfmiddlewaretoken" value="">"#),
            None
        );
    }
}
