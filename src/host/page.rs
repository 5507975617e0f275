//! Headless page host backed by `scraper`
//!
//! The page is loaded from an HTML string, a file or (feature `net`) an
//! HTTP(S) URL. Popups are in-memory documents; "printing" one spools its
//! markup to `<spool_dir>/<title>.html` when a spool directory is configured.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use scraper::{ElementRef, Html, Selector};
use url::Url;

#[cfg(feature = "net")]
use reqwest::blocking::Client;
#[cfg(feature = "net")]
use std::time::Duration;

use super::{ElementSnapshot, LoadHandler, Locator, PopupWindow, PrintHost, WindowFeatures};
use crate::event_loop::{EventLoop, Scheduler};
use crate::{Error, Result};

/// Whether the host lets the page open popups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopupPolicy {
    #[default]
    Allow,
    Block,
}

/// Configuration for a [`PageHost`]
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// User agent string sent when loading pages over HTTP
    pub user_agent: String,
    /// Timeout for page loads in milliseconds
    pub timeout_ms: u64,
    pub popup_policy: PopupPolicy,
    /// Directory printed documents are written to; `None` discards them
    pub spool_dir: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/115.0 RFOX/0.3"
                .to_string(),
            timeout_ms: 30000,
            popup_policy: PopupPolicy::Allow,
            spool_dir: None,
        }
    }
}

/// What happened to one popup opened by a [`PageHost`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupRecord {
    pub name: String,
    pub features: WindowFeatures,
    /// Document written so far
    pub document: String,
    pub sealed: bool,
    pub focused: bool,
    pub print_count: usize,
    /// Spool file of the last print, if any
    pub spooled_to: Option<PathBuf>,
    pub closed: bool,
}

type PopupRegistry = Rc<RefCell<Vec<PopupRecord>>>;

pub struct PageHost {
    config: HostConfig,
    html: Option<String>,
    base_url: Option<Url>,
    notices: Vec<String>,
    popups: PopupRegistry,
    event_loop: EventLoop,
    #[cfg(feature = "net")]
    client: Client,
}

impl PageHost {
    pub fn new(config: HostConfig) -> Result<Self> {
        #[cfg(feature = "net")]
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::LoadError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            html: None,
            base_url: None,
            notices: Vec::new(),
            popups: Rc::new(RefCell::new(Vec::new())),
            event_loop: EventLoop::new(),
            #[cfg(feature = "net")]
            client,
        })
    }

    /// Replace the page with `html`; `base_url` anchors relative links
    pub fn load_html(&mut self, html: &str, base_url: Option<&str>) -> Result<()> {
        let base = match base_url {
            Some(u) => Some(
                Url::parse(u)
                    .map_err(|e| Error::LoadError(format!("Invalid base URL {}: {}", u, e)))?,
            ),
            None => None,
        };
        self.html = Some(html.to_string());
        self.base_url = base;
        Ok(())
    }

    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let html = std::fs::read_to_string(path)
            .map_err(|e| Error::LoadError(format!("Failed to read {}: {}", path.display(), e)))?;
        let base = path
            .canonicalize()
            .ok()
            .and_then(|p| Url::from_file_path(p).ok());
        self.html = Some(html);
        self.base_url = base;
        Ok(())
    }

    #[cfg(feature = "net")]
    pub fn load_url(&mut self, url: &str) -> Result<()> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::LoadError(format!("Failed to fetch {}: {}", url, e)))?;
        let final_url = resp.url().clone();
        let body = resp
            .text()
            .map_err(|e| Error::LoadError(format!("Failed to read response body: {}", e)))?;
        self.html = Some(body);
        self.base_url = Some(final_url);
        Ok(())
    }

    /// Load an `http(s)://` URL or a file path
    pub fn load(&mut self, target: &str) -> Result<()> {
        if target.starts_with("http://") || target.starts_with("https://") {
            #[cfg(feature = "net")]
            {
                return self.load_url(target);
            }
            #[cfg(not(feature = "net"))]
            {
                return Err(Error::LoadError(format!(
                    "Loading {} requires the 'net' feature",
                    target
                )));
            }
        }
        self.load_file(Path::new(target))
    }

    /// Title of the loaded page
    pub fn title(&self) -> Option<String> {
        self.html.as_deref().and_then(crate::document::title_of)
    }

    pub fn set_popup_policy(&mut self, policy: PopupPolicy) {
        self.config.popup_policy = policy;
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub fn popups(&self) -> Vec<PopupRecord> {
        self.popups.borrow().clone()
    }

    /// Popups opened and not yet closed
    pub fn open_popups(&self) -> usize {
        self.popups.borrow().iter().filter(|p| !p.closed).count()
    }

    pub fn run_until_idle(&mut self) -> usize {
        self.event_loop.run_until_idle()
    }

    pub fn run_realtime(&mut self) -> usize {
        self.event_loop.run_realtime()
    }
}

fn snapshot(el: ElementRef<'_>) -> ElementSnapshot {
    ElementSnapshot {
        tag: el.value().name().to_string(),
        outer_html: el.html(),
        inner_html: el.inner_html(),
    }
}

impl PrintHost for PageHost {
    fn resolve(&self, locator: Locator<'_>) -> Option<ElementSnapshot> {
        let html = self.html.as_ref()?;
        let document = Html::parse_document(html);
        let found = match locator {
            Locator::Id(id) => document
                .root_element()
                .descendants()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().id() == Some(id))
                .map(snapshot),
            Locator::Selector(sel) => match Selector::parse(sel) {
                Ok(selector) => document.select(&selector).next().map(snapshot),
                Err(e) => {
                    log::warn!("invalid selector '{}': {:?}", sel, e);
                    None
                }
            },
        };
        found
    }

    fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    fn open_popup(&mut self, features: &WindowFeatures) -> Option<Box<dyn PopupWindow>> {
        if self.config.popup_policy == PopupPolicy::Block {
            log::debug!("page host: popup blocked by policy");
            return None;
        }
        let mut popups = self.popups.borrow_mut();
        let index = popups.len();
        let name = format!("print-popup-{}", index + 1);
        popups.push(PopupRecord {
            name: name.clone(),
            features: features.clone(),
            document: String::new(),
            sealed: false,
            focused: false,
            print_count: 0,
            spooled_to: None,
            closed: false,
        });
        Some(Box::new(SpoolPopup {
            name,
            index,
            registry: self.popups.clone(),
            spool_dir: self.config.spool_dir.clone(),
        }))
    }

    fn notify(&mut self, message: &str) {
        log::warn!("notice: {}", message);
        self.notices.push(message.to_string());
    }

    fn on_load(&mut self, popup: Box<dyn PopupWindow>, handler: LoadHandler) {
        if !popup.is_sealed() {
            log::warn!("page host: {} handed over before sealing", popup.name());
        }
        // The document is static markup, so it is loaded once the current task yields.
        self.event_loop.set_timeout(
            std::time::Duration::ZERO,
            Box::new(move |scheduler: &mut dyn Scheduler| handler(popup, scheduler)),
        );
    }
}

struct SpoolPopup {
    name: String,
    index: usize,
    registry: PopupRegistry,
    spool_dir: Option<PathBuf>,
}

impl SpoolPopup {
    fn with_record<T>(&self, f: impl FnOnce(&mut PopupRecord) -> T) -> T {
        let mut popups = self.registry.borrow_mut();
        f(&mut popups[self.index])
    }

    fn spool(&self, dir: &Path, markup: &str) -> Result<PathBuf> {
        let title = crate::document::title_of(markup).unwrap_or_else(|| self.name.clone());
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.html", file_stem(&title)));
        std::fs::write(&path, markup)?;
        Ok(path)
    }
}

/// Title made safe for use as a file name
pub fn file_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim().trim_matches('.').to_string();
    if stem.is_empty() {
        "print".to_string()
    } else {
        stem
    }
}

impl PopupWindow for SpoolPopup {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, markup: &str) -> Result<()> {
        self.with_record(|r| {
            if r.sealed {
                return Err(Error::DocumentSealed);
            }
            if r.closed {
                return Err(Error::DocumentWrite(format!("{} is closed", r.name)));
            }
            r.document.push_str(markup);
            Ok(())
        })
    }

    fn seal(&mut self) -> Result<()> {
        self.with_record(|r| r.sealed = true);
        Ok(())
    }

    fn is_sealed(&self) -> bool {
        self.with_record(|r| r.sealed)
    }

    fn focus(&mut self) {
        self.with_record(|r| r.focused = true);
    }

    fn print(&mut self) {
        let markup = self.with_record(|r| {
            r.print_count += 1;
            r.document.clone()
        });
        let Some(dir) = self.spool_dir.clone() else {
            log::info!("{}: printed ({} bytes, no spool directory)", self.name, markup.len());
            return;
        };
        match self.spool(&dir, &markup) {
            Ok(path) => {
                log::info!("{}: spooled to {}", self.name, path.display());
                self.with_record(|r| r.spooled_to = Some(path));
            }
            Err(e) => log::warn!("{}: spooling failed: {}", self.name, e),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.with_record(|r| {
            if r.closed {
                return Err(Error::Other(format!("{} is already closed", r.name)));
            }
            r.closed = true;
            Ok(())
        })
    }
}
