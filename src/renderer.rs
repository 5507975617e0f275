//! The print-popup rendering pipeline
//!
//! One invocation walks `Idle -> Resolved -> Opened -> DocumentSealed ->
//! Printed -> Closed`. Resolution and popup creation can fail; both failures
//! are terminal, surface exactly one notice and leave no window behind. Once
//! the document is sealed the popup is handed to the host and the rest of the
//! lifecycle runs on the host's event loop.

use std::cell::Cell;
use std::rc::Rc;

use log::{debug, info, warn};

use crate::document::PrintDocument;
use crate::event_loop::Scheduler;
use crate::extract;
use crate::host::{ElementSnapshot, Locator, PopupWindow, PrintHost, WindowFeatures};
use crate::{ContentSource, Error, PrintConfig, Result};

/// Why an invocation stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ContentNotFound,
    PopupBlocked,
    DocumentWrite,
}

/// Lifecycle state of a single render invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Resolved,
    Opened,
    DocumentSealed,
    Printed,
    Closed,
    Failed(FailureKind),
}

impl RenderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderState::Closed | RenderState::Failed(_))
    }
}

/// Summary of a successfully sealed print document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    /// Generated document title
    pub title: String,
    /// Hex SHA-256 of the document markup
    pub digest: String,
    /// Markup length in bytes
    pub bytes: usize,
    /// Name the host gave the popup
    pub popup: String,
    /// `window.open` feature string used
    pub features: String,
}

/// Handle on an invocation whose popup is now owned by the host
#[derive(Debug)]
pub struct Rendered {
    pub report: RenderReport,
    state: Rc<Cell<RenderState>>,
}

impl Rendered {
    /// Current lifecycle state; advances as the host's event loop runs
    pub fn state(&self) -> RenderState {
        self.state.get()
    }
}

fn transition(state: &Cell<RenderState>, next: RenderState) {
    debug!("print popup: {:?} -> {:?}", state.get(), next);
    state.set(next);
}

/// Renders content sources into print popups through a [`PrintHost`]
pub struct PrintPopupRenderer<H: PrintHost> {
    host: H,
}

impl<H: PrintHost> PrintPopupRenderer<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    fn resolve(&self, source: &ContentSource) -> Option<ElementSnapshot> {
        self.host.resolve(Locator::Id(&source.id)).or_else(|| {
            let selector = source.fallback_selector.as_deref()?;
            debug!("print popup: '{}' not found, trying '{}'", source.id, selector);
            self.host.resolve(Locator::Selector(selector))
        })
    }

    fn fail(
        &mut self,
        state: &Cell<RenderState>,
        kind: FailureKind,
        err: Error,
        notify: bool,
    ) -> Error {
        transition(state, RenderState::Failed(kind));
        if notify {
            if let Some(notice) = err.notice() {
                self.host.notify(notice);
            }
        }
        err
    }

    /// Snapshot `source`, open a popup and seal the composed document in it.
    ///
    /// Focus, print and the delayed close happen later, when the host delivers
    /// the popup's load event.
    pub fn render(&mut self, source: &ContentSource, config: &PrintConfig) -> Result<Rendered> {
        let state = Rc::new(Cell::new(RenderState::Idle));

        let snapshot = match self.resolve(source) {
            Some(s) => s,
            None => {
                let err = Error::ContentNotFound(source.id.clone());
                return Err(self.fail(&state, FailureKind::ContentNotFound, err, source.required));
            }
        };
        transition(&state, RenderState::Resolved);

        let content = extract::content(&snapshot, config);
        drop(snapshot);

        let features = WindowFeatures::popup(config.geometry);
        let mut popup = match self.host.open_popup(&features) {
            Some(p) => p,
            None => {
                return Err(self.fail(&state, FailureKind::PopupBlocked, Error::PopupBlocked, true));
            }
        };
        transition(&state, RenderState::Opened);

        let now = self.host.now();
        let document = PrintDocument::compose(config, &content, now, self.host.base_url());

        if let Err(err) = popup.write(document.markup()).and_then(|_| popup.seal()) {
            warn!("print popup {}: document write failed: {}", popup.name(), err);
            if let Err(e) = popup.close() {
                debug!("print popup {}: close after failed write: {}", popup.name(), e);
            }
            let err = match err {
                Error::DocumentWrite(_) => err,
                other => Error::DocumentWrite(other.to_string()),
            };
            return Err(self.fail(&state, FailureKind::DocumentWrite, err, false));
        }
        transition(&state, RenderState::DocumentSealed);

        let report = RenderReport {
            title: document.title().to_string(),
            digest: document.digest(),
            bytes: document.len(),
            popup: popup.name().to_string(),
            features: features.feature_string(),
        };
        debug!(
            "print popup {}: sealed '{}' ({} bytes)",
            report.popup, report.title, report.bytes
        );

        let delay = config.auto_close_delay();
        let lifecycle = state.clone();
        self.host.on_load(
            popup,
            Box::new(move |mut popup: Box<dyn PopupWindow>, scheduler: &mut dyn Scheduler| {
                popup.focus();
                popup.print();
                transition(&lifecycle, RenderState::Printed);
                info!("print popup {}: print triggered", popup.name());
                scheduler.set_timeout(
                    delay,
                    Box::new(move |_: &mut dyn Scheduler| {
                        if let Err(e) = popup.close() {
                            debug!("print popup {}: close ignored: {}", popup.name(), e);
                        }
                        transition(&lifecycle, RenderState::Closed);
                    }),
                );
            }),
        );

        Ok(Rendered { report, state })
    }

    /// Build the document `render` would write, without opening a popup or
    /// notifying the user.
    pub fn compose(&self, source: &ContentSource, config: &PrintConfig) -> Result<PrintDocument> {
        let snapshot = self
            .resolve(source)
            .ok_or_else(|| Error::ContentNotFound(source.id.clone()))?;
        let content = extract::content(&snapshot, config);
        Ok(PrintDocument::compose(
            config,
            &content,
            self.host.now(),
            self.host.base_url(),
        ))
    }

    /// Fire-and-forget form of [`render`](Self::render). Failures have
    /// already been shown to the user by the time this returns.
    pub fn print(&mut self, source: &ContentSource, config: &PrintConfig) {
        if let Err(e) = self.render(source, config) {
            debug!("print popup: '{}' not printed: {}", source.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostEvent, RecordingHost};
    use std::time::Duration;

    fn host_with_table() -> RecordingHost {
        RecordingHost::new().with_element(
            "summary",
            ElementSnapshot::wrap("div", "summary", "<table><tr><td>1</td></tr></table>"),
        )
    }

    #[test]
    fn state_advances_with_the_event_loop() {
        let mut r = PrintPopupRenderer::new(host_with_table());
        let rendered = r
            .render(&ContentSource::id("summary"), &PrintConfig::default())
            .unwrap();
        assert_eq!(rendered.state(), RenderState::DocumentSealed);

        r.host_mut().advance(Duration::ZERO);
        assert_eq!(rendered.state(), RenderState::Printed);

        r.host_mut().advance(Duration::from_millis(699));
        assert_eq!(rendered.state(), RenderState::Printed);
        r.host_mut().advance(Duration::from_millis(1));
        assert_eq!(rendered.state(), RenderState::Closed);
        assert!(rendered.state().is_terminal());
    }

    #[test]
    fn optional_source_fails_without_notice() {
        let mut r = PrintPopupRenderer::new(RecordingHost::new());
        let err = r
            .render(&ContentSource::id("missing").optional(), &PrintConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::ContentNotFound(ref id) if id == "missing"));
        assert!(r.host().notices().is_empty());
        assert_eq!(r.host().popups_opened(), 0);
    }

    #[test]
    fn fallback_selector_is_used_when_id_is_absent() {
        let host = RecordingHost::new().with_selector_match(
            ".container",
            ElementSnapshot::wrap("div", "c", "<p>fallback</p>"),
        );
        let mut r = PrintPopupRenderer::new(host);
        let src = ContentSource::id("nope").with_fallback(".container");
        r.render(&src, &PrintConfig::default()).unwrap();
        let wrote = r.host().events().into_iter().any(|e| {
            matches!(
                e.event,
                HostEvent::Write { ref markup, .. } if markup.contains("<p>fallback</p>")
            )
        });
        assert!(wrote);
    }

    #[test]
    fn failed_write_closes_popup_without_notice() {
        let mut r = PrintPopupRenderer::new(host_with_table().with_failing_writes());
        let err = r
            .render(&ContentSource::id("summary"), &PrintConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::DocumentWrite(_)));
        assert!(r.host().notices().is_empty());
        let events = r.host().events();
        assert!(matches!(
            events.last().map(|e| &e.event),
            Some(HostEvent::Closed { .. })
        ));
        assert_eq!(r.host_mut().run_until_idle(), 0);
    }

    #[test]
    fn compose_has_no_side_effects() {
        let r = PrintPopupRenderer::new(host_with_table());
        let doc = r
            .compose(&ContentSource::id("summary"), &PrintConfig::default())
            .unwrap();
        assert!(doc.markup().contains("<td>1</td>"));
        assert_eq!(r.host().popups_opened(), 0);
        assert!(r.host().events().is_empty());

        let err = r
            .compose(&ContentSource::id("missing"), &PrintConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::ContentNotFound(_)));
        assert!(r.host().notices().is_empty());
    }

    #[test]
    fn print_swallows_failures_after_notice() {
        let mut r = PrintPopupRenderer::new(RecordingHost::new());
        r.print(&ContentSource::id("missing"), &PrintConfig::default());
        assert_eq!(r.host().notices(), vec!["Content not found!".to_string()]);
    }
}
