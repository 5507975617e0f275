//! In-memory host that records every capability call
//!
//! Useful in tests and examples: elements are registered up front, popups can
//! be blocked or made to fail on write, and the load event is delivered on a
//! virtual clock so lifecycle timing can be asserted exactly.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use url::Url;

use super::{ElementSnapshot, LoadHandler, Locator, PopupWindow, PrintHost, WindowFeatures};
use crate::event_loop::{EventLoop, LoopClock, Scheduler};
use crate::{Error, Result};

/// A capability call observed by [`RecordingHost`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Notice(String),
    Opened { popup: String, features: String },
    Write { popup: String, markup: String },
    Sealed { popup: String },
    Loaded { popup: String },
    Focused { popup: String },
    PrintTriggered { popup: String },
    Closed { popup: String },
}

/// A [`HostEvent`] stamped with the virtual time it happened at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub at: Duration,
    pub event: HostEvent,
}

type EventLog = Rc<RefCell<Vec<RecordedEvent>>>;

fn record(log: &EventLog, clock: &LoopClock, event: HostEvent) {
    log.borrow_mut().push(RecordedEvent {
        at: clock.now(),
        event,
    });
}

pub struct RecordingHost {
    elements: HashMap<String, ElementSnapshot>,
    selectors: HashMap<String, ElementSnapshot>,
    base_url: Option<Url>,
    block_popups: bool,
    fail_writes: bool,
    load_latency: Duration,
    wall_clock: DateTime<Utc>,
    opened: usize,
    log: EventLog,
    event_loop: EventLoop,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingHost {
    /// Empty page, popups allowed, wall clock fixed at 2024-03-05 10:20:30 UTC
    pub fn new() -> Self {
        Self {
            elements: HashMap::new(),
            selectors: HashMap::new(),
            base_url: None,
            block_popups: false,
            fail_writes: false,
            load_latency: Duration::ZERO,
            wall_clock: Utc
                .with_ymd_and_hms(2024, 3, 5, 10, 20, 30)
                .single()
                .unwrap_or_default(),
            opened: 0,
            log: Rc::new(RefCell::new(Vec::new())),
            event_loop: EventLoop::new(),
        }
    }

    pub fn with_element(mut self, id: &str, snapshot: ElementSnapshot) -> Self {
        self.elements.insert(id.to_string(), snapshot);
        self
    }

    pub fn with_selector_match(mut self, selector: &str, snapshot: ElementSnapshot) -> Self {
        self.selectors.insert(selector.to_string(), snapshot);
        self
    }

    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Refuse every popup request
    pub fn with_popups_blocked(mut self) -> Self {
        self.block_popups = true;
        self
    }

    /// Make every popup write fail
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Time between sealing a popup and its load event
    pub fn with_load_latency(mut self, latency: Duration) -> Self {
        self.load_latency = latency;
        self
    }

    pub fn with_wall_clock(mut self, at: DateTime<Utc>) -> Self {
        self.wall_clock = at;
        self
    }

    /// Replace or insert an element after construction (simulates page edits)
    pub fn set_element(&mut self, id: &str, snapshot: ElementSnapshot) {
        self.elements.insert(id.to_string(), snapshot);
    }

    pub fn remove_element(&mut self, id: &str) -> Option<ElementSnapshot> {
        self.elements.remove(id)
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.log.borrow().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter_map(|e| match &e.event {
                HostEvent::Notice(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of popups successfully opened
    pub fn popups_opened(&self) -> usize {
        self.opened
    }

    /// Virtual time of the first event on `popup` matching `pred`
    pub fn time_of(&self, popup: &str, pred: impl Fn(&HostEvent) -> bool) -> Option<Duration> {
        self.log
            .borrow()
            .iter()
            .find(|e| event_popup(&e.event) == Some(popup) && pred(&e.event))
            .map(|e| e.at)
    }

    pub fn advance(&mut self, by: Duration) -> usize {
        self.event_loop.advance(by)
    }

    pub fn run_until_idle(&mut self) -> usize {
        self.event_loop.run_until_idle()
    }
}

/// Popup name an event refers to, if any
pub fn event_popup(event: &HostEvent) -> Option<&str> {
    match event {
        HostEvent::Notice(_) => None,
        HostEvent::Opened { popup, .. }
        | HostEvent::Write { popup, .. }
        | HostEvent::Sealed { popup }
        | HostEvent::Loaded { popup }
        | HostEvent::Focused { popup }
        | HostEvent::PrintTriggered { popup }
        | HostEvent::Closed { popup } => Some(popup),
    }
}

impl PrintHost for RecordingHost {
    fn resolve(&self, locator: Locator<'_>) -> Option<ElementSnapshot> {
        match locator {
            Locator::Id(id) => self.elements.get(id).cloned(),
            Locator::Selector(sel) => self.selectors.get(sel).cloned(),
        }
    }

    fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.event_loop.clock().now()).unwrap_or_default();
        self.wall_clock + elapsed
    }

    fn open_popup(&mut self, features: &WindowFeatures) -> Option<Box<dyn PopupWindow>> {
        if self.block_popups {
            return None;
        }
        self.opened += 1;
        let name = format!("popup-{}", self.opened);
        let clock = self.event_loop.clock();
        record(
            &self.log,
            &clock,
            HostEvent::Opened {
                popup: name.clone(),
                features: features.feature_string(),
            },
        );
        Some(Box::new(RecordingPopup {
            name,
            log: self.log.clone(),
            clock,
            fail_writes: self.fail_writes,
            sealed: false,
            closed: false,
        }))
    }

    fn notify(&mut self, message: &str) {
        record(&self.log, &self.event_loop.clock(), HostEvent::Notice(message.to_string()));
    }

    fn on_load(&mut self, popup: Box<dyn PopupWindow>, handler: LoadHandler) {
        let log = self.log.clone();
        let clock = self.event_loop.clock();
        self.event_loop.set_timeout(
            self.load_latency,
            Box::new(move |scheduler: &mut dyn Scheduler| {
                record(
                    &log,
                    &clock,
                    HostEvent::Loaded {
                        popup: popup.name().to_string(),
                    },
                );
                handler(popup, scheduler);
            }),
        );
    }
}

struct RecordingPopup {
    name: String,
    log: EventLog,
    clock: LoopClock,
    fail_writes: bool,
    sealed: bool,
    closed: bool,
}

impl RecordingPopup {
    fn record(&self, event: HostEvent) {
        record(&self.log, &self.clock, event);
    }
}

impl PopupWindow for RecordingPopup {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, markup: &str) -> Result<()> {
        if self.sealed {
            return Err(Error::DocumentSealed);
        }
        if self.fail_writes {
            return Err(Error::DocumentWrite("simulated write failure".into()));
        }
        self.record(HostEvent::Write {
            popup: self.name.clone(),
            markup: markup.to_string(),
        });
        Ok(())
    }

    fn seal(&mut self) -> Result<()> {
        self.sealed = true;
        self.record(HostEvent::Sealed {
            popup: self.name.clone(),
        });
        Ok(())
    }

    fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn focus(&mut self) {
        self.record(HostEvent::Focused {
            popup: self.name.clone(),
        });
    }

    fn print(&mut self) {
        self.record(HostEvent::PrintTriggered {
            popup: self.name.clone(),
        });
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::Other(format!("{} is already closed", self.name)));
        }
        self.closed = true;
        self.record(HostEvent::Closed {
            popup: self.name.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Geometry;

    #[test]
    fn blocked_host_opens_nothing() {
        let mut host = RecordingHost::new().with_popups_blocked();
        assert!(host
            .open_popup(&WindowFeatures::popup(Geometry::default()))
            .is_none());
        assert_eq!(host.popups_opened(), 0);
        assert!(host.events().is_empty());
    }

    #[test]
    fn popup_rejects_writes_after_seal() {
        let mut host = RecordingHost::new();
        let mut popup = host
            .open_popup(&WindowFeatures::popup(Geometry::default()))
            .unwrap();
        popup.write("<p>a</p>").unwrap();
        popup.seal().unwrap();
        assert!(matches!(popup.write("<p>b</p>"), Err(Error::DocumentSealed)));
        assert!(popup.close().is_ok());
        assert!(popup.close().is_err());
    }

    #[test]
    fn load_event_respects_latency() {
        let mut host = RecordingHost::new().with_load_latency(Duration::from_millis(40));
        let mut popup = host
            .open_popup(&WindowFeatures::popup(Geometry::default()))
            .unwrap();
        popup.seal().unwrap();
        host.on_load(
            popup,
            Box::new(|_: Box<dyn PopupWindow>, _: &mut dyn Scheduler| {}),
        );
        assert_eq!(host.advance(Duration::from_millis(39)), 0);
        assert_eq!(host.advance(Duration::from_millis(1)), 1);
        assert_eq!(
            host.time_of("popup-1", |e| matches!(e, HostEvent::Loaded { .. })),
            Some(Duration::from_millis(40))
        );
    }

    #[test]
    fn wall_clock_follows_virtual_time() {
        let mut host = RecordingHost::new();
        let start = host.now();
        host.advance(Duration::from_millis(1500));
        assert_eq!((host.now() - start).num_milliseconds(), 1500);
    }
}
