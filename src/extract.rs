//! Payload and heading extraction from an element snapshot

use scraper::{Html, Selector};

use crate::document::{HeadingText, PrintContent};
use crate::host::ElementSnapshot;
use crate::labels::apply_labels;
use crate::{Heading, Payload, PrintConfig};

/// Everything the document needs from the snapshot, per `config`
pub fn content(snapshot: &ElementSnapshot, config: &PrintConfig) -> PrintContent {
    PrintContent {
        heading: heading(snapshot, config),
        payload: payload(snapshot, &config.payload),
    }
}

/// Payload markup. Inner and outer modes copy the snapshot byte for byte;
/// nested mode yields the first matching descendant, or nothing.
pub fn payload(snapshot: &ElementSnapshot, mode: &Payload) -> String {
    match mode {
        Payload::InnerHtml => snapshot.inner_html.clone(),
        Payload::OuterHtml => snapshot.outer_html.clone(),
        Payload::Nested { selector } => {
            with_first_match(snapshot, selector, |el| el.html()).unwrap_or_default()
        }
    }
}

/// Heading text with labels applied, if the configuration asks for one
pub fn heading(snapshot: &ElementSnapshot, config: &PrintConfig) -> Option<HeadingText> {
    let labels = &config.labels;
    match &config.heading {
        Heading::None => None,
        Heading::Fixed { title, subtitle } => Some(HeadingText {
            title: apply_labels(title, labels),
            subtitle: subtitle.as_ref().map(|s| apply_labels(s, labels)),
        }),
        Heading::FromContent {
            selector,
            fallback,
            title,
        } => {
            // Text nodes concatenated as-is, like textContent
            let text = with_first_match(snapshot, selector, |el| el.text().collect::<String>())
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| apply_labels(fallback, labels));
            Some(match title {
                Some(title) => HeadingText {
                    title: apply_labels(title, labels),
                    subtitle: Some(text),
                },
                None => HeadingText {
                    title: text,
                    subtitle: None,
                },
            })
        }
    }
}

// Descendants only: the element itself never matches, as with querySelector.
fn with_first_match<T>(
    snapshot: &ElementSnapshot,
    selector: &str,
    f: impl FnOnce(scraper::ElementRef<'_>) -> T,
) -> Option<T> {
    let sel = match Selector::parse(selector) {
        Ok(sel) => sel,
        Err(e) => {
            log::warn!("invalid selector '{}': {:?}", selector, e);
            return None;
        }
    };
    let fragment = Html::parse_fragment(&snapshot.inner_html);
    let found = fragment.select(&sel).next().map(f);
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ElementSnapshot {
        ElementSnapshot::wrap(
            "div",
            "summary",
            "<h4>  Net   Pay </h4><table><tr><td>100</td></tr></table><p>note</p>",
        )
    }

    #[test]
    fn inner_and_outer_payloads_are_verbatim() {
        let s = summary();
        assert_eq!(payload(&s, &Payload::InnerHtml), s.inner_html);
        assert_eq!(payload(&s, &Payload::OuterHtml), s.outer_html);
    }

    #[test]
    fn nested_payload_selects_first_descendant() {
        let s = summary();
        let table = payload(
            &s,
            &Payload::Nested {
                selector: "table".into(),
            },
        );
        assert!(table.starts_with("<table>"));
        assert!(table.contains("<td>100</td>"));
        assert!(!table.contains("note"));

        let none = payload(
            &s,
            &Payload::Nested {
                selector: "ul".into(),
            },
        );
        assert!(none.is_empty());

        // the snapshot root itself is not a candidate
        let root = payload(
            &s,
            &Payload::Nested {
                selector: "div".into(),
            },
        );
        assert!(root.is_empty());
    }

    #[test]
    fn heading_from_content_uses_text_content() {
        let cfg = PrintConfig {
            heading: Heading::FromContent {
                selector: "h4".into(),
                fallback: "Summary".into(),
                title: Some("Print Summary".into()),
            },
            ..Default::default()
        };
        let h = heading(&summary(), &cfg).unwrap();
        assert_eq!(h.title, "Print Summary");
        assert_eq!(h.subtitle.as_deref(), Some("Net   Pay"));

        let nested = ElementSnapshot::wrap("div", "s", "<h4>Net<b>Pay</b></h4>");
        let h = heading(&nested, &cfg).unwrap();
        assert_eq!(h.subtitle.as_deref(), Some("NetPay"));

        let blank = ElementSnapshot::wrap("div", "s", "<h4>   </h4>");
        let h = heading(&blank, &cfg).unwrap();
        assert_eq!(h.subtitle.as_deref(), Some("Summary"));
    }

    #[test]
    fn heading_falls_back_when_selector_misses() {
        let cfg = PrintConfig {
            heading: Heading::FromContent {
                selector: "h3".into(),
                fallback: "Summary".into(),
                title: None,
            },
            ..Default::default()
        };
        let h = heading(&summary(), &cfg).unwrap();
        assert_eq!(h.title, "Summary");
        assert!(h.subtitle.is_none());
    }

    #[test]
    fn fixed_heading_uses_labels() {
        let cfg = PrintConfig {
            heading: Heading::Fixed {
                title: "Compensation Summary".into(),
                subtitle: Some("{month} {year}".into()),
            },
            ..Default::default()
        }
        .with_label("month", "March")
        .with_label("year", "2024");
        let c = content(&summary(), &cfg);
        let h = c.heading.unwrap();
        assert_eq!(h.title, "Compensation Summary");
        assert_eq!(h.subtitle.as_deref(), Some("March 2024"));
        assert_eq!(c.payload, summary().inner_html);
    }

    #[test]
    fn invalid_selector_yields_empty_payload() {
        let out = payload(
            &summary(),
            &Payload::Nested {
                selector: "[[".into(),
            },
        );
        assert!(out.is_empty());
    }
}
