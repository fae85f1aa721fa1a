//! Rendering of search parameters in the admin API's query language.

/// A substring-contains predicate: `<field> co "<value>"`.
///
/// Embedded double quotes in `value` are backslash-escaped.
#[must_use]
pub fn contains_query(field: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{field} co \"{escaped}\"")
}

/// Requested output fields, each prefixed with `items.`.
///
/// Blank entries are dropped; an empty list renders as an empty string so
/// the parameter can be omitted.
#[must_use]
pub fn item_fields<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| f.as_ref().trim())
        .filter(|f| !f.is_empty())
        .map(|f| format!("items.{f}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a comma-separated field list as typed on the command line.
#[must_use]
pub fn split_field_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_query() {
        assert_eq!(contains_query("email", "gmail.com"), r#"email co "gmail.com""#);
        assert_eq!(contains_query("name", r#"say "hi""#), r#"name co "say \"hi\"""#);
    }

    #[test]
    fn test_item_fields() {
        assert_eq!(item_fields(&["id", "email"]), "items.id,items.email");
        assert_eq!(item_fields(&[" id ", ""]), "items.id");
        assert_eq!(item_fields::<&str>(&[]), "");
    }

    #[test]
    fn test_split_field_list() {
        assert_eq!(split_field_list("id, email,,name "), vec!["id", "email", "name"]);
        assert!(split_field_list("").is_empty());
    }
}
