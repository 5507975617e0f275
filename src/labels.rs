//! `{name}` placeholder substitution for titles, headings and identifiers

use std::collections::BTreeMap;

/// Replace every `{name}` whose name has a label; unknown placeholders are
/// left untouched.
pub fn apply_labels(template: &str, labels: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match labels.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// First placeholder name still present in `text`
pub fn missing_label(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let after = &text[open + 1..];
    let close = after.find('}')?;
    let name = &after[..close];
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        Some(name)
    } else {
        missing_label(&after[close + 1..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_known_labels() {
        let l = labels(&[("month", "March"), ("year", "2024")]);
        assert_eq!(
            apply_labels("monthly-compensation-summary-{month}-{year}", &l),
            "monthly-compensation-summary-March-2024"
        );
    }

    #[test]
    fn keeps_unknown_and_unbalanced_braces() {
        let l = labels(&[("year", "2024")]);
        assert_eq!(apply_labels("{month} {year}", &l), "{month} 2024");
        assert_eq!(apply_labels("a { b", &l), "a { b");
        assert_eq!(missing_label("{month} 2024"), Some("month"));
        assert_eq!(missing_label("body { color: red }"), None);
        assert_eq!(missing_label("plain"), None);
    }
}
