use crate::host::{HostConfig, PageHost, PopupRecord};
use crate::{ContentSource, Error, PrintConfig, PrintPopupRenderer, RenderReport, Result};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    LoadHtml(String, Option<String>, oneshot::Sender<Result<()>>),
    Load(String, oneshot::Sender<Result<()>>),
    Print(ContentSource, PrintConfig, oneshot::Sender<Result<RenderReport>>),
    Notices(oneshot::Sender<Vec<String>>),
    Popups(oneshot::Sender<Vec<PopupRecord>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async-friendly print renderer backed by a dedicated worker thread.
///
/// The worker thread owns the [`PageHost`] (which is not `Send`) and runs
/// each print's lifecycle to completion in real time before taking the next
/// command, so callers see popups already closed when `print` resolves.
#[derive(Clone)]
pub struct Printer {
    cmd_tx: Sender<Command>,
}

impl Printer {
    /// Create a new printer (spawns a background thread that owns the host).
    pub async fn new(config: Option<HostConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::spawn(move || {
            let host = match PageHost::new(config) {
                Ok(h) => h,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };
            let mut renderer = PrintPopupRenderer::new(host);
            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::LoadHtml(html, base, resp) => {
                        let res = renderer.host_mut().load_html(&html, base.as_deref());
                        let _ = resp.send(res);
                    }
                    Command::Load(target, resp) => {
                        let res = renderer.host_mut().load(&target);
                        let _ = resp.send(res);
                    }
                    Command::Print(source, config, resp) => {
                        let res = renderer.render(&source, &config).map(|r| r.report);
                        let ran = renderer.host_mut().run_realtime();
                        log::debug!("printer worker: ran {} timers", ran);
                        let _ = resp.send(res);
                    }
                    Command::Notices(resp) => {
                        let _ = resp.send(renderer.host().notices().to_vec());
                    }
                    Command::Popups(resp) => {
                        let _ = resp.send(renderer.host().popups());
                    }
                    Command::Close(resp) => {
                        renderer.host_mut().run_until_idle();
                        let _ = resp.send(Ok(()));
                        break;
                    }
                }
            }
        });

        let init_res = init_rx
            .await
            .map_err(|e| Error::Other(format!("Worker init canceled: {}", e)))?;
        init_res?;

        Ok(Self { cmd_tx })
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| Error::Other("Printer worker has stopped".to_string()))
    }

    /// Replace the page with an HTML string
    pub async fn load_html(&self, html: &str, base_url: Option<&str>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::LoadHtml(
            html.to_string(),
            base_url.map(|s| s.to_string()),
            tx,
        ))?;
        rx.await
            .map_err(|e| Error::Other(format!("LoadHtml canceled: {}", e)))?
    }

    /// Load a URL or file path
    pub async fn load(&self, target: &str) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Load(target.to_string(), tx))?;
        rx.await
            .map_err(|e| Error::Other(format!("Load canceled: {}", e)))?
    }

    /// Render `source` and wait for its popup to print and close
    pub async fn print(&self, source: ContentSource, config: PrintConfig) -> Result<RenderReport> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Print(source, config, tx))?;
        rx.await
            .map_err(|e| Error::Other(format!("Print canceled: {}", e)))?
    }

    pub async fn notices(&self) -> Result<Vec<String>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Notices(tx))?;
        rx.await
            .map_err(|e| Error::Other(format!("Notices canceled: {}", e)))
    }

    pub async fn popups(&self) -> Result<Vec<PopupRecord>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Popups(tx))?;
        rx.await
            .map_err(|e| Error::Other(format!("Popups canceled: {}", e)))
    }

    /// Drain pending timers and stop the worker.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Close(tx))?;
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?
    }
}
