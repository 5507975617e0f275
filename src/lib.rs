//! RFox Print
//!
//! Snapshot a fragment of a rendered page into a standalone, print-ready HTML
//! document, open it in a popup and drive the focus/print/close lifecycle.
//!
//! # Features
//!
//! - **One renderer, many layouts**: every print variant is a [`PrintConfig`]
//!   value (see [`presets`]) instead of a copy of the same function
//! - **Injected capabilities**: element lookup, popup creation, document
//!   writes, notices and timers all go through [`host::PrintHost`], so the
//!   pipeline runs against a headless [`host::PageHost`] or a recording fake
//! - **Deterministic timing**: the lifecycle is sequenced on the popup load
//!   event and a configurable auto-close timer on an [`event_loop::EventLoop`]
//!
//! # Example
//!
//! ```
//! use rfprint::host::{ElementSnapshot, RecordingHost};
//! use rfprint::{ContentSource, PrintConfig, PrintPopupRenderer, RenderState};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let host = RecordingHost::new().with_element(
//!     "totals",
//!     ElementSnapshot::wrap("div", "totals", "<table><tr><td>42</td></tr></table>"),
//! );
//! let mut renderer = PrintPopupRenderer::new(host);
//!
//! let config = PrintConfig {
//!     title: "Totals".to_string(),
//!     ..Default::default()
//! };
//! let rendered = renderer.render(&ContentSource::id("totals"), &config)?;
//! assert!(rendered.report.title.starts_with("Totals_"));
//!
//! renderer.host_mut().run_until_idle();
//! assert_eq!(rendered.state(), RenderState::Closed);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod document;
pub mod event_loop;
pub mod extract;
pub mod host;
pub mod labels;
pub mod presets;
pub mod renderer;

// Async-friendly printer API (worker-thread backed)
#[cfg(feature = "async")]
pub mod async_api;

#[cfg(feature = "async")]
pub use async_api::Printer;

pub use document::PrintDocument;
pub use presets::{Preset, PresetCatalog};
pub use renderer::{PrintPopupRenderer, RenderReport, RenderState, Rendered};

/// Footer timestamp pattern, e.g. `2024-03-05 10:20:30 UTC`
pub const DEFAULT_FOOTER_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Popup window dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Reference to a region of the currently rendered page
///
/// The element is resolved when a render starts, copied once and never kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSource {
    /// Element identifier (the `id` attribute)
    pub id: String,
    /// Whether a missing element is reported to the user
    pub required: bool,
    /// CSS selector tried when no element carries `id`
    pub fallback_selector: Option<String>,
}

impl ContentSource {
    /// A required source identified by element id
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            required: true,
            fallback_selector: None,
        }
    }

    /// Absence fails quietly, without a notice
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_fallback(mut self, selector: impl Into<String>) -> Self {
        self.fallback_selector = Some(selector.into());
        self
    }
}

/// A stylesheet referenced or embedded by the print document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stylesheet {
    /// External stylesheet URL, emitted as `<link rel="stylesheet">`
    Link(String),
    /// CSS text appended to the document's style block
    Inline(String),
}

/// Which part of the resolved element becomes the document payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Payload {
    /// The element's children (its inner markup)
    #[default]
    InnerHtml,
    /// The element itself including its own tag
    OuterHtml,
    /// The first descendant matching `selector`; empty when none matches
    Nested { selector: String },
}

/// Heading rendered above the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Heading {
    #[default]
    None,
    /// Fixed heading text; both fields accept `{label}` placeholders
    Fixed {
        title: String,
        #[serde(default)]
        subtitle: Option<String>,
    },
    /// Text of the first descendant matching `selector`, or `fallback`.
    ///
    /// With `title` set, the extracted text is shown as the subtitle.
    FromContent {
        selector: String,
        fallback: String,
        #[serde(default)]
        title: Option<String>,
    },
}

/// `@page` setup emitted into the print rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSetup {
    /// CSS page size (`A4`, `auto`, `letter landscape`, ...)
    pub size: String,
    /// CSS page margin
    pub margin: String,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            size: "A4".to_string(),
            margin: "10mm".to_string(),
        }
    }
}

/// Configuration describing how a print popup is rendered
///
/// Every field has a default, so presets and JSON files only need to name
/// what differs.
///
/// # Examples
///
/// ```
/// let cfg = rfprint::PrintConfig::default();
/// assert_eq!(cfg.auto_close_delay_ms, 700);
/// assert!(cfg.timestamp_title);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    /// Logical document name; accepts `{label}` placeholders
    pub title: String,
    /// Suffix the title with a filesystem-safe timestamp
    pub timestamp_title: bool,
    pub heading: Heading,
    pub payload: Payload,
    pub stylesheets: Vec<Stylesheet>,
    pub page: PageSetup,
    /// Border applied to table cells
    pub table_border: String,
    /// Selectors kept on a single page where possible
    pub avoid_break_selectors: Vec<String>,
    /// Selectors hidden from the printout
    pub hidden_selectors: Vec<String>,
    pub geometry: Geometry,
    /// Render a timestamp footer
    pub footer_timestamp: bool,
    /// Text before the footer timestamp
    pub footer_label: String,
    /// `chrono` strftime pattern for the footer timestamp
    pub footer_format: String,
    /// Delay between the print trigger and closing the popup
    pub auto_close_delay_ms: u64,
    /// Embed a load/print/close script so the document prints on its own
    pub embed_lifecycle_script: bool,
    /// Display labels substituted into `{name}` placeholders
    pub labels: BTreeMap<String, String>,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            title: "Print".to_string(),
            timestamp_title: true,
            heading: Heading::None,
            payload: Payload::InnerHtml,
            stylesheets: Vec::new(),
            page: PageSetup::default(),
            table_border: "1px solid #ddd".to_string(),
            avoid_break_selectors: vec![".card".to_string(), "table".to_string()],
            hidden_selectors: vec!["button".to_string(), ".no-print".to_string()],
            geometry: Geometry::default(),
            footer_timestamp: true,
            footer_label: "Printed on".to_string(),
            footer_format: DEFAULT_FOOTER_FORMAT.to_string(),
            auto_close_delay_ms: 700,
            embed_lifecycle_script: false,
            labels: BTreeMap::new(),
        }
    }
}

impl PrintConfig {
    /// Add a display label, e.g. `("month", "March")`
    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }

    pub fn auto_close_delay(&self) -> Duration {
        Duration::from_millis(self.auto_close_delay_ms)
    }
}
