use iced::{
    widget::{button, column, progress_bar, scrollable, text, Row},
    Element, Font, Length,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::domain::{PopupEvent, PopupKind, Progress};

#[derive(Debug, Clone)]
pub enum PopupMessage {
    OptionPressed(String),
    Acknowledged,
}

/// Message text and one button per option
pub struct ChoiceView {
    pub message: String,
    pub options: Vec<String>,
    reply: UnboundedSender<String>,
}

impl ChoiceView {
    /// Returns the label when it is one of the offered options.
    pub fn choose(&self, label: &str) -> Option<String> {
        self.options.iter().find(|option| *option == label).cloned()
    }
}

/// Accumulated command output. `displayed` trails `buffer` until the next tick.
#[derive(Debug, Default)]
pub struct OutputView {
    pub buffer: String,
    pub displayed: String,
}

impl OutputView {
    pub fn push_line(&mut self, line: &str) {
        self.buffer.push_str(line);
        self.buffer.push('\n');
    }

    pub fn refresh(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        if self.displayed.len() != self.buffer.len() {
            self.displayed.clone_from(&self.buffer);
        }
    }
}

#[derive(Debug, Default)]
pub struct ProgressView {
    pub progress: Progress,
}

impl ProgressView {
    pub fn label(&self) -> String {
        format!(
            "{}% ({}/{})",
            self.progress.percent(),
            self.progress.downloaded,
            self.progress.total
        )
    }
}

pub struct MessageView {
    pub message: String,
    reply: UnboundedSender<()>,
}

pub enum PopupView {
    Choice(ChoiceView),
    Output(OutputView),
    Progress(ProgressView),
    Message(MessageView),
}

impl From<PopupKind> for PopupView {
    fn from(kind: PopupKind) -> Self {
        match kind {
            PopupKind::Choice {
                message,
                options,
                reply,
            } => PopupView::Choice(ChoiceView {
                message,
                options,
                reply,
            }),
            PopupKind::Output => PopupView::Output(OutputView::default()),
            PopupKind::Progress => PopupView::Progress(ProgressView::default()),
            PopupKind::Message { message, reply } => {
                PopupView::Message(MessageView { message, reply })
            }
        }
    }
}

impl PopupView {
    /// Apply an event sent by the background job
    pub fn apply(&mut self, event: PopupEvent) {
        match (self, event) {
            (PopupView::Output(view), PopupEvent::Line(line)) => view.push_line(&line),
            (PopupView::Progress(view), PopupEvent::Progress(progress)) => {
                view.progress = progress;
            }
            (_, event) => tracing::debug!("ignoring {:?} for this popup", event),
        }
    }

    /// Poll tick
    pub fn tick(&mut self) {
        if let PopupView::Output(view) = self {
            view.refresh();
        }
    }

    pub fn update(&mut self, message: PopupMessage) {
        match (self, message) {
            (PopupView::Choice(view), PopupMessage::OptionPressed(label)) => {
                // Anything outside the option list keeps the popup waiting
                if let Some(selected) = view.choose(&label) {
                    let _ = view.reply.send(selected);
                }
            }
            (PopupView::Message(view), PopupMessage::Acknowledged) => {
                let _ = view.reply.send(());
            }
            _ => {}
        }
    }

    pub fn view(&self) -> Element<'_, PopupMessage> {
        match self {
            PopupView::Choice(view) => column![
                text(&view.message),
                Row::with_children(view.options.iter().map(|option| {
                    button(text(option))
                        .on_press(PopupMessage::OptionPressed(option.clone()))
                        .padding([6, 16])
                        .into()
                }))
                .spacing(10),
            ]
            .padding(20)
            .spacing(16)
            .into(),
            PopupView::Output(view) => scrollable(text(&view.displayed).font(Font::MONOSPACE))
                .anchor_bottom()
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            PopupView::Progress(view) => column![
                progress_bar(0.0..=100.0, view.progress.percent() as f32),
                text(view.label()).size(14),
            ]
            .padding(20)
            .spacing(10)
            .into(),
            PopupView::Message(view) => column![
                text(&view.message),
                button("OK")
                    .on_press(PopupMessage::Acknowledged)
                    .padding([6, 16]),
            ]
            .padding(20)
            .spacing(16)
            .into(),
        }
    }
}
