//! Capability surface the renderer depends on
//!
//! A [`PrintHost`] stands in for the browser globals the print pipeline
//! needs: element lookup, popup creation, user notices and the popup load
//! event. Popups are owned through [`PopupWindow`] handles. Two hosts ship
//! with the crate: [`PageHost`] (a headless page parsed with `scraper`) and
//! [`RecordingHost`] (an in-memory fake that records every call).

pub mod page;
pub mod recording;

pub use page::{HostConfig, PageHost, PopupPolicy, PopupRecord};
pub use recording::{HostEvent, RecordedEvent, RecordingHost};

use chrono::{DateTime, Utc};
use url::Url;

use crate::event_loop::Scheduler;
use crate::{Geometry, Result};

/// Immutable copy of an element's markup taken at resolution time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    /// Lowercase tag name
    pub tag: String,
    /// The element including its own tag
    pub outer_html: String,
    /// The element's children
    pub inner_html: String,
}

impl ElementSnapshot {
    /// Build a snapshot for `<tag id="id">inner</tag>`
    pub fn wrap(tag: &str, id: &str, inner_html: &str) -> Self {
        Self {
            tag: tag.to_string(),
            outer_html: format!(
                "<{tag} id=\"{}\">{inner_html}</{tag}>",
                crate::document::escape_attr(id)
            ),
            inner_html: inner_html.to_string(),
        }
    }
}

/// How an element is looked up on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator<'a> {
    /// Element whose `id` attribute equals the value
    Id(&'a str),
    /// First element matching a CSS selector
    Selector(&'a str),
}

/// Parameters of a `window.open`-style request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowFeatures {
    /// Target browsing context name (`_blank` for a fresh window)
    pub target: String,
    pub geometry: Geometry,
}

impl WindowFeatures {
    /// A fresh, independent popup of the given size
    pub fn popup(geometry: Geometry) -> Self {
        Self {
            target: "_blank".to_string(),
            geometry,
        }
    }

    /// Feature string in `window.open` syntax
    pub fn feature_string(&self) -> String {
        format!(
            "width={},height={}",
            self.geometry.width, self.geometry.height
        )
    }
}

/// An open popup window owned by exactly one render invocation
pub trait PopupWindow {
    /// Host-assigned window name, unique per host
    fn name(&self) -> &str;

    /// Append markup to the popup's document stream
    fn write(&mut self, markup: &str) -> Result<()>;

    /// Finalize the document; later writes fail with `DocumentSealed`
    fn seal(&mut self) -> Result<()>;

    fn is_sealed(&self) -> bool;

    /// Bring the popup to the foreground
    fn focus(&mut self);

    /// Trigger the platform print dialog. Returns once the dialog is dismissed;
    /// a platform that ignores the call is indistinguishable from one that
    /// printed.
    fn print(&mut self);

    fn close(&mut self) -> Result<()>;
}

/// Callback run when a sealed popup has finished loading
pub type LoadHandler = Box<dyn FnOnce(Box<dyn PopupWindow>, &mut dyn Scheduler)>;

/// The ambient capabilities of the page that invokes printing
pub trait PrintHost {
    /// Resolve an element and copy its markup
    fn resolve(&self, locator: Locator<'_>) -> Option<ElementSnapshot>;

    /// URL relative stylesheet references are resolved against
    fn base_url(&self) -> Option<&Url> {
        None
    }

    /// Wall-clock time used for titles and footers
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Open a new browsing context; `None` when the platform refuses
    fn open_popup(&mut self, features: &WindowFeatures) -> Option<Box<dyn PopupWindow>>;

    /// Show a blocking notice to the user
    fn notify(&mut self, message: &str);

    /// Hand over a sealed popup; `handler` runs once its load event fires
    fn on_load(&mut self, popup: Box<dyn PopupWindow>, handler: LoadHandler);
}
