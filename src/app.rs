use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use futures::StreamExt;
use iced::{window, Element, Size, Subscription, Task};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;

use crate::api::Downloader;
use crate::application::Popups;
use crate::domain::{AppError, PopupId, PopupKind, Request, Result};
use crate::logging::Logger;
use crate::ui::{PopupMessage, PopupView};

/// How often open windows pick up accumulated output
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

struct PopupWindow {
    popup: PopupId,
    title: String,
    view: PopupView,
    cancel: CancellationToken,
}

/// UI-thread state: one entry per open popup window
#[derive(Default)]
pub struct PopupHost {
    windows: HashMap<window::Id, PopupWindow>,
}

#[derive(Debug, Clone)]
pub enum Message {
    Request(Request),
    Opened(window::Id),
    Tick,
    CloseRequested(window::Id),
    Popup(window::Id, PopupMessage),
}

impl PopupHost {
    fn boot(requests: Option<UnboundedReceiver<Request>>) -> (Self, Task<Message>) {
        let host = Self::default();
        let Some(requests) = requests else {
            return (host, iced::exit());
        };

        // Shut down once every workflow-side sender is gone
        let stream = futures::stream::unfold(requests, |mut requests| async move {
            requests.recv().await.map(|request| (request, requests))
        })
        .chain(futures::stream::once(async { Request::Shutdown }));

        (host, Task::run(stream, Message::Request))
    }

    fn window_of(&self, popup: PopupId) -> Option<window::Id> {
        self.windows
            .iter()
            .find(|(_, window)| window.popup == popup)
            .map(|(id, _)| *id)
    }
}

fn window_settings(kind: &PopupKind) -> window::Settings {
    let size = match kind {
        PopupKind::Output => Size::new(720.0, 540.0),
        PopupKind::Progress => Size::new(460.0, 120.0),
        PopupKind::Choice { .. } | PopupKind::Message { .. } => Size::new(460.0, 160.0),
    };

    window::Settings {
        size,
        exit_on_close_request: false,
        ..Default::default()
    }
}

pub fn update(host: &mut PopupHost, message: Message) -> Task<Message> {
    match message {
        Message::Request(Request::Open {
            popup,
            title,
            kind,
            cancel,
        }) => {
            let (id, opened) = window::open(window_settings(&kind));
            host.windows.insert(
                id,
                PopupWindow {
                    popup,
                    title,
                    view: PopupView::from(kind),
                    cancel,
                },
            );
            return opened.map(Message::Opened);
        }
        Message::Request(Request::Update { popup, event }) => {
            if let Some(window) = host.windows.values_mut().find(|w| w.popup == popup) {
                window.view.apply(event);
            }
        }
        Message::Request(Request::Close { popup }) => {
            if let Some(id) = host.window_of(popup) {
                host.windows.remove(&id);
                return window::close(id);
            }
        }
        Message::Request(Request::Shutdown) => {
            tracing::debug!("workflow finished, closing popup host");
            for window in host.windows.values() {
                window.cancel.cancel();
            }
            return iced::exit();
        }
        Message::Opened(id) => {
            tracing::debug!("window {:?} opened", id);
        }
        Message::Tick => {
            for window in host.windows.values_mut() {
                window.view.tick();
            }
        }
        Message::CloseRequested(id) => {
            if let Some(window) = host.windows.remove(&id) {
                tracing::info!("'{}' closed by user", window.title);
                window.cancel.cancel();
            }
            return window::close(id);
        }
        Message::Popup(id, popup_message) => {
            if let Some(window) = host.windows.get_mut(&id) {
                window.view.update(popup_message);
            }
        }
    }
    Task::none()
}

pub fn view(host: &PopupHost, id: window::Id) -> Element<'_, Message> {
    match host.windows.get(&id) {
        Some(window) => window
            .view
            .view()
            .map(move |message| Message::Popup(id, message)),
        None => iced::widget::text("").into(),
    }
}

pub fn title(host: &PopupHost, id: window::Id) -> String {
    host.windows
        .get(&id)
        .map(|window| window.title.clone())
        .unwrap_or_default()
}

pub fn subscription(_host: &PopupHost) -> Subscription<Message> {
    Subscription::batch([
        iced::time::every(POLL_INTERVAL).map(|_| Message::Tick),
        window::close_requests().map(Message::CloseRequested),
    ])
}

/// Serve popup requests on the calling thread until the request channel closes
pub fn run_host(requests: UnboundedReceiver<Request>) -> iced::Result {
    let requests = Mutex::new(Some(requests));

    iced::daemon(
        move || PopupHost::boot(requests.lock().ok().and_then(|mut slot| slot.take())),
        update,
        view,
    )
    .title(title)
    .subscription(subscription)
    .run()
}

/// Run `workflow` on a worker thread while this thread hosts its popups.
///
/// Returns the workflow's result once it has finished and the host has shut down.
pub fn run<T, F, Fut>(logger: Logger, workflow: F) -> Result<T>
where
    F: FnOnce(Popups) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>>,
    T: Send + 'static,
{
    let (requests, receiver) = mpsc::unbounded_channel();
    let popups = Popups::new(requests, logger, Downloader::default());

    let worker = std::thread::spawn(move || -> Result<T> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(workflow(popups))
    });

    let hosted = run_host(receiver);
    let result = worker.join().map_err(|_| AppError::WorkerPanicked)?;

    if let Err(e) = hosted {
        return Err(AppError::Gui(e.to_string()));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PopupEvent;

    fn open(host: &mut PopupHost, popup: u64, kind: PopupKind) -> (window::Id, CancellationToken) {
        let cancel = CancellationToken::new();
        let _ = update(
            host,
            Message::Request(Request::Open {
                popup: PopupId(popup),
                title: format!("popup {}", popup),
                kind,
                cancel: cancel.clone(),
            }),
        );
        let id = host.window_of(PopupId(popup)).unwrap();
        (id, cancel)
    }

    #[test]
    fn test_output_reaches_window_on_tick() {
        let mut host = PopupHost::default();
        let (id, _) = open(&mut host, 1, PopupKind::Output);

        for line in ["a", "b"] {
            let _ = update(
                &mut host,
                Message::Request(Request::Update {
                    popup: PopupId(1),
                    event: PopupEvent::Line(line.to_string()),
                }),
            );
        }
        let _ = update(&mut host, Message::Tick);

        assert_eq!(title(&host, id), "popup 1");
        let PopupView::Output(output) = &host.windows[&id].view else {
            panic!("expected output view");
        };
        assert_eq!(output.displayed, "a\nb\n");
    }

    #[test]
    fn test_user_close_cancels_job() {
        let mut host = PopupHost::default();
        let (id, cancel) = open(&mut host, 7, PopupKind::Progress);

        let _ = update(&mut host, Message::CloseRequested(id));

        assert!(cancel.is_cancelled());
        assert!(host.windows.is_empty());
    }

    #[test]
    fn test_workflow_close_keeps_token() {
        let mut host = PopupHost::default();
        let (_, cancel) = open(&mut host, 3, PopupKind::Output);

        let _ = update(
            &mut host,
            Message::Request(Request::Close { popup: PopupId(3) }),
        );

        assert!(!cancel.is_cancelled());
        assert!(host.window_of(PopupId(3)).is_none());
    }
}
