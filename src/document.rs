//! Composition of the standalone print document
//!
//! A [`PrintDocument`] is plain markup: a fixed skeleton, the configured
//! stylesheets, structural print rules, an optional heading, the payload
//! copied verbatim and an optional footer. It holds no reference to the page
//! the payload was taken from.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, SecondsFormat, Utc};
use scraper::{Html, Selector};
use sha2::{Digest, Sha256};
use url::Url;

use crate::labels::apply_labels;
use crate::{PrintConfig, Stylesheet, DEFAULT_FOOTER_FORMAT};

/// Heading text after extraction and label substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingText {
    pub title: String,
    pub subtitle: Option<String>,
}

/// Everything taken from the page for one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintContent {
    pub heading: Option<HeadingText>,
    /// Markup inserted into the body unmodified
    pub payload: String,
}

/// A composed print document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintDocument {
    title: String,
    markup: String,
}

impl PrintDocument {
    /// Build the document for `content` as printed at `printed_at`.
    ///
    /// Relative stylesheet links are made absolute against `base_url` so the
    /// document still resolves them once detached from the page.
    pub fn compose(
        config: &PrintConfig,
        content: &PrintContent,
        printed_at: DateTime<Utc>,
        base_url: Option<&Url>,
    ) -> Self {
        let title = document_title(config, printed_at);

        let mut head = String::new();
        head.push_str("<meta charset=\"UTF-8\">\n");
        head.push_str(&format!("<title>{}</title>\n", escape_text(&title)));
        for sheet in &config.stylesheets {
            if let Stylesheet::Link(href) = sheet {
                head.push_str(&format!(
                    "<link rel=\"stylesheet\" href=\"{}\">\n",
                    escape_attr(&resolve_href(href, base_url))
                ));
            }
        }
        head.push_str("<style>\n");
        head.push_str(&print_rules(config));
        for sheet in &config.stylesheets {
            if let Stylesheet::Inline(css) = sheet {
                head.push_str(css);
                head.push('\n');
            }
        }
        head.push_str("</style>\n");

        let mut body = String::new();
        if let Some(heading) = &content.heading {
            body.push_str("<div class=\"print-header\">\n");
            body.push_str(&format!("<h2>{}</h2>\n", escape_text(&heading.title)));
            if let Some(sub) = &heading.subtitle {
                body.push_str(&format!("<h4>{}</h4>\n", escape_text(sub)));
            }
            body.push_str("</div>\n");
        }
        body.push_str("<div class=\"print-body\">\n");
        body.push_str(&content.payload);
        body.push_str("\n</div>\n");
        if config.footer_timestamp {
            body.push_str(&format!(
                "<div class=\"print-footer\"><p>{}: {}</p></div>\n",
                escape_text(&config.footer_label),
                escape_text(&footer_stamp(&config.footer_format, printed_at))
            ));
        }
        if config.embed_lifecycle_script {
            body.push_str(&lifecycle_script(config.auto_close_delay_ms));
        }

        let markup = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n{head}</head>\n<body>\n{body}</body>\n</html>\n"
        );

        Self { title, markup }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn len(&self) -> usize {
        self.markup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markup.is_empty()
    }

    /// Hex SHA-256 of the markup
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.markup.as_bytes()))
    }
}

/// ISO-8601 UTC timestamp with `:` and `.` replaced by `-`
///
/// Millisecond precision, so documents printed a millisecond apart get
/// distinct titles (and default "save as PDF" file names).
pub fn timestamp_token(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// Title for the document: labels applied, timestamp suffixed when enabled
pub fn document_title(config: &PrintConfig, at: DateTime<Utc>) -> String {
    let name = apply_labels(&config.title, &config.labels);
    if config.timestamp_title {
        format!("{}_{}", name, timestamp_token(at))
    } else {
        name
    }
}

/// Structural print CSS derived from the configuration
pub fn print_rules(config: &PrintConfig) -> String {
    let mut css = String::new();
    css.push_str(&format!(
        "@page {{ size: {}; margin: {}; }}\n",
        config.page.size, config.page.margin
    ));
    css.push_str(
        "body { font-family: Arial, sans-serif; color: #000; background: #fff; \
         -webkit-print-color-adjust: exact; print-color-adjust: exact; }\n",
    );
    css.push_str("table { width: 100%; border-collapse: collapse; margin-bottom: 10px; }\n");
    css.push_str(&format!(
        "th, td {{ border: {}; padding: 4px 6px; }}\n",
        config.table_border
    ));
    css.push_str(".print-header { text-align: center; margin-bottom: 20px; }\n");
    css.push_str(".print-footer { margin-top: 20px; text-align: right; font-size: 0.9em; }\n");
    css.push_str(".table-responsive { overflow: visible !important; }\n");
    if !config.avoid_break_selectors.is_empty() {
        css.push_str(&format!(
            "{} {{ break-inside: avoid; page-break-inside: avoid; }}\n",
            config.avoid_break_selectors.join(", ")
        ));
    }
    if !config.hidden_selectors.is_empty() {
        css.push_str(&format!(
            "@media print {{ {} {{ display: none !important; }} }}\n",
            config.hidden_selectors.join(", ")
        ));
    }
    css
}

/// `printed_at` rendered with `format`; an invalid pattern falls back to
/// [`DEFAULT_FOOTER_FORMAT`]
pub fn footer_stamp(format: &str, printed_at: DateTime<Utc>) -> String {
    let valid = !StrftimeItems::new(format).any(|item| matches!(item, Item::Error));
    if valid {
        printed_at.format(format).to_string()
    } else {
        log::warn!("invalid footer format '{}', using the default", format);
        printed_at.format(DEFAULT_FOOTER_FORMAT).to_string()
    }
}

fn lifecycle_script(delay_ms: u64) -> String {
    format!(
        "<script>\nwindow.onload = function() {{\n  window.focus();\n  window.print();\n  \
         setTimeout(function() {{ window.close(); }}, {delay_ms});\n}};\n</script>\n"
    )
}

fn resolve_href(href: &str, base_url: Option<&Url>) -> String {
    if Url::parse(href).is_ok() {
        return href.to_string();
    }
    match base_url.map(|base| base.join(href)) {
        Some(Ok(abs)) => abs.to_string(),
        _ => {
            log::warn!("stylesheet '{}' stays relative; the popup may not load it", href);
            href.to_string()
        }
    }
}

/// Text of a document's `<title>`, if present
pub fn title_of(markup: &str) -> Option<String> {
    let document = Html::parse_document(markup);
    let sel = Selector::parse("title").ok()?;
    let title = document
        .select(&sel)
        .next()
        .map(|n| n.text().collect::<String>())?;
    let title = title.trim().to_string();
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Escape text for element content
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape text for a double-quoted attribute value
pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
