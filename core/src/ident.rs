//! SQL identifier quoting.

/// Quotes an identifier for use in SQL text.
///
/// Wraps the name in double quotes and doubles any embedded double quote, so
/// the result always parses as a single identifier regardless of content.
///
/// # Examples
///
/// ```
/// use clientbook_core::quote_ident;
///
/// assert_eq!(quote_ident("Users"), r#""Users""#);
/// assert_eq!(quote_ident(r#"a"b"#), r#""a""b""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    let mut quoted = String::with_capacity(ident.len() + 2);
    quoted.push('"');
    for c in ident.chars() {
        if c == '"' {
            quoted.push('"');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Quotes each identifier and joins them with `, `.
///
/// # Examples
///
/// ```
/// use clientbook_core::quote_ident_list;
///
/// assert_eq!(quote_ident_list(&["a", "b"]), r#""a", "b""#);
/// ```
pub fn quote_ident_list<S: AsRef<str>>(idents: &[S]) -> String {
    idents
        .iter()
        .map(|ident| quote_ident(ident.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}
