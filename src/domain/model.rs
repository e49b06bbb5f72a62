use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Identifies one popup across the workflow/UI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopupId(pub u64);

/// Bytes written so far and the total announced by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub downloaded: u64,
    pub total: u64,
}

impl Progress {
    pub fn new(downloaded: u64, total: u64) -> Self {
        Self { downloaded, total }
    }

    /// Whole percent, 0 while the total is unknown.
    pub fn percent(&self) -> u64 {
        crate::utils::percent(self.downloaded, self.total)
    }
}

/// What a popup window shows and, for interactive kinds, where the answer goes.
#[derive(Debug, Clone)]
pub enum PopupKind {
    Choice {
        message: String,
        options: Vec<String>,
        reply: UnboundedSender<String>,
    },
    Output,
    Progress,
    Message {
        message: String,
        reply: UnboundedSender<()>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupEvent {
    Line(String),
    Progress(Progress),
}

/// Sent from the workflow thread to the popup host.
#[derive(Debug, Clone)]
pub enum Request {
    Open {
        popup: PopupId,
        title: String,
        kind: PopupKind,
        cancel: CancellationToken,
    },
    Update {
        popup: PopupId,
        event: PopupEvent,
    },
    Close {
        popup: PopupId,
    },
    Shutdown,
}
