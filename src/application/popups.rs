use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::api::{process, Downloader, ShellCommand};
use crate::domain::{AppError, PopupEvent, PopupId, PopupKind, Progress, Request, Result};
use crate::logging::Logger;

/// Workflow-side handle to the popup host.
///
/// Every call opens one window, runs its job in the calling task and closes
/// the window again. Closing the window early cancels the job and the call
/// returns [`AppError::Cancelled`].
#[derive(Debug, Clone)]
pub struct Popups {
    requests: UnboundedSender<Request>,
    logger: Logger,
    downloader: Downloader,
    next_id: Arc<AtomicU64>,
}

/// An open window; dropping it asks the host to close it
struct OpenPopup<'a> {
    popups: &'a Popups,
    id: PopupId,
    cancel: CancellationToken,
}

impl Drop for OpenPopup<'_> {
    fn drop(&mut self) {
        let _ = self.popups.requests.send(Request::Close { popup: self.id });
    }
}

impl Popups {
    pub fn new(requests: UnboundedSender<Request>, logger: Logger, downloader: Downloader) -> Self {
        Self {
            requests,
            logger,
            downloader,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    fn open(&self, title: &str, kind: PopupKind) -> Result<OpenPopup<'_>> {
        let id = PopupId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let cancel = CancellationToken::new();

        self.requests
            .send(Request::Open {
                popup: id,
                title: title.to_string(),
                kind,
                cancel: cancel.clone(),
            })
            .map_err(|_| AppError::HostClosed)?;

        tracing::debug!("opened popup {:?} '{}'", id, title);
        Ok(OpenPopup {
            popups: self,
            id,
            cancel,
        })
    }

    fn send_event(&self, popup: PopupId, event: PopupEvent) {
        let _ = self.requests.send(Request::Update { popup, event });
    }

    /// Show `message` with one button per option and wait for a press.
    pub async fn options(&self, title: &str, message: &str, options: &[&str]) -> Result<String> {
        let (reply, mut chosen) = mpsc::unbounded_channel();
        let popup = self.open(
            title,
            PopupKind::Choice {
                message: message.to_string(),
                options: options.iter().map(|option| option.to_string()).collect(),
                reply,
            },
        )?;

        tokio::select! {
            label = chosen.recv() => label.ok_or(AppError::HostClosed),
            _ = popup.cancel.cancelled() => Err(AppError::Cancelled),
        }
    }

    /// Run `command` with its output streamed into a window; returns the exit code.
    pub async fn execute(&self, title: &str, command: impl Into<ShellCommand>) -> Result<i32> {
        self.execute_with(title, command, |_| {}).await
    }

    /// Like [`Popups::execute`], also handing every line to `on_write`.
    pub async fn execute_with<F>(
        &self,
        title: &str,
        command: impl Into<ShellCommand>,
        mut on_write: F,
    ) -> Result<i32>
    where
        F: FnMut(&str),
    {
        let popup = self.open(title, PopupKind::Output)?;
        let id = popup.id;

        let run = process::run_with(command, |line| {
            self.logger.log(line);
            self.send_event(id, PopupEvent::Line(line.to_string()));
            on_write(line);
        });

        tokio::select! {
            code = run => code,
            _ = popup.cancel.cancelled() => {
                self.logger.log(format!("'{}' cancelled by user", title));
                Err(AppError::Cancelled)
            }
        }
    }

    /// Download `url` to `destination` behind a progress bar.
    ///
    /// A partially written file is removed when the download fails or is cancelled.
    pub async fn download(&self, title: &str, url: &str, destination: &Path) -> Result<PathBuf> {
        let popup = self.open(title, PopupKind::Progress)?;
        let id = popup.id;

        let transfer = self.downloader.download(url, destination, |downloaded, total| {
            self.send_event(id, PopupEvent::Progress(Progress::new(downloaded, total)));
        });

        let result = tokio::select! {
            done = transfer => done,
            _ = popup.cancel.cancelled() => Err(AppError::Cancelled),
        };

        match result {
            Ok(()) => Ok(destination.to_path_buf()),
            Err(e) => {
                self.logger.log(format!("download of '{}' failed: {}", url, e));
                if tokio::fs::remove_file(destination).await.is_ok() {
                    tracing::debug!("removed partial download {}", destination.display());
                }
                Err(e)
            }
        }
    }

    /// Log `message`, show it until acknowledged and hand back the error to abort with.
    pub async fn fatal(&self, title: &str, message: &str) -> AppError {
        self.logger.log(message);

        let (reply, mut acknowledged) = mpsc::unbounded_channel();
        match self.open(
            title,
            PopupKind::Message {
                message: message.to_string(),
                reply,
            },
        ) {
            Ok(popup) => {
                tokio::select! {
                    _ = acknowledged.recv() => {}
                    _ = popup.cancel.cancelled() => {}
                }
            }
            Err(e) => tracing::warn!("could not show '{}': {}", message, e),
        }

        AppError::Aborted(message.to_string())
    }
}
