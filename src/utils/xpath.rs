/// Quote `value` as an XPath 1.0 string literal.
///
/// XPath has no escape sequences, so a value containing both quote kinds is assembled with
/// `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    if !value.contains('\'') {
        return format!("'{}'", value);
    }

    let parts: Vec<String> = value
        .split('"')
        .map(|part| format!("\"{}\"", part))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}
