/// Main application structure and lifecycle management
use super::{chat, widgets};
use crate::config::Config;
use crate::core::{ChatSession, SubmitError};
use eframe::egui;
use std::fmt;
use std::time::Duration;

/// Repaint interval while the thinking animation runs
const THINKING_REPAINT: Duration = Duration::from_millis(50);

/// Text under the input field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLine {
    Ready,
    Thinking,
    Cancelled,
    Rejected(SubmitError),
}

impl StatusLine {
    /// Status to show once the session has gone idle again. Anything that
    /// only made sense while a reply was pending goes back to `Ready`.
    pub fn settle(self, is_busy: bool) -> Self {
        match self {
            StatusLine::Thinking | StatusLine::Rejected(SubmitError::Busy) if !is_busy => {
                StatusLine::Ready
            }
            other => other,
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLine::Ready => write!(f, "Ready"),
            StatusLine::Thinking => write!(f, "Thinking..."),
            StatusLine::Cancelled => write!(f, "Cancelled"),
            StatusLine::Rejected(e) => write!(f, "Not sent: {e}"),
        }
    }
}

pub struct CoachApp {
    pub config: Config,
    pub session: ChatSession,
    pub input_text: String,
    pub status: StatusLine,
    pub style_initialized: bool,
}

impl CoachApp {
    pub fn new(config: Config, session: ChatSession) -> Self {
        Self {
            config,
            session,
            input_text: String::new(),
            status: StatusLine::Ready,
            style_initialized: false,
        }
    }

    fn init_style(&mut self, ctx: &egui::Context) {
        if self.style_initialized {
            return;
        }
        ctx.set_visuals(egui::Visuals::light());
        self.style_initialized = true;
    }

    pub fn send_message(&mut self, ctx: &egui::Context) {
        match self.session.submit(&self.input_text) {
            Ok(()) => {
                self.input_text.clear();
                self.status = StatusLine::Thinking;

                // Repaint once the reply lands
                let session = self.session.clone();
                let ctx_clone = ctx.clone();
                tokio::spawn(async move {
                    session.wait_until_idle().await;
                    ctx_clone.request_repaint();
                });
            }
            Err(e) => {
                log::debug!("Message not sent: {}", e);
                self.status = StatusLine::Rejected(e);
            }
        }
    }

    pub fn cancel_response(&mut self) {
        if self.session.cancel() {
            self.status = StatusLine::Cancelled;
        }
    }

    /// Discards the current conversation and starts an empty one.
    pub fn new_conversation(&mut self) {
        match ChatSession::new(self.config.session.clone()) {
            Ok(session) => {
                self.session.cancel();
                self.session = session;
                self.input_text.clear();
                self.status = StatusLine::Ready;
                log::info!("🗑️ Conversation reset");
            }
            Err(e) => log::error!("Failed to start a new conversation: {}", e),
        }
    }

    fn draw_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.heading(format!("Chat with {}", self.config.coach_name));
                    ui.label(
                        egui::RichText::new("Ask me anything about business, marketing, or leadership!")
                            .size(12.0)
                            .color(egui::Color32::GRAY),
                    );
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("New conversation").clicked() {
                        self.new_conversation();
                    }
                    if self.session.is_busy() && ui.button("Cancel").clicked() {
                        self.cancel_response();
                    }
                });
            });
            ui.add_space(6.0);
        });
    }

    fn draw_footer(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("input").show(ctx, |ui| {
            ui.add_space(8.0);
            let is_thinking = self.session.is_busy();
            if chat::draw_input_row(ui, &mut self.input_text, is_thinking) {
                self.send_message(ctx);
            }

            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(self.status.to_string()).size(11.0).color(egui::Color32::GRAY));
            });
            widgets::draw_stats_bar(ui, &self.session.stats(), self.session.len());
            ui.add_space(6.0);
        });
    }

    fn draw_transcript(&mut self, ctx: &egui::Context) {
        let history = self.session.history();
        let is_thinking = self.session.is_busy();

        egui::CentralPanel::default().show(ctx, |ui| {
            if history.is_empty() && !is_thinking {
                if let Some(prompt) = chat::draw_starter_prompts(ui, &self.config.starter_prompts) {
                    self.input_text = prompt;
                }
            } else {
                chat::draw_messages(ui, &history, &self.config.coach_name, is_thinking);
            }
        });
    }

    fn check_cancel_key(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.cancel_response();
        }
    }
}

impl eframe::App for CoachApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.init_style(ctx);
        self.check_cancel_key(ctx);

        let is_busy = self.session.is_busy();
        if is_busy {
            ctx.request_repaint_after(THINKING_REPAINT);
        }
        self.status = self.status.settle(is_busy);

        self.draw_header(ctx);
        self.draw_footer(ctx);
        self.draw_transcript(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_rejection_clears_once_idle() {
        let status = StatusLine::Rejected(SubmitError::Busy);
        assert_eq!(status.settle(true), status);
        assert_eq!(status.settle(false), StatusLine::Ready);
    }

    #[test]
    fn thinking_clears_once_idle() {
        assert_eq!(StatusLine::Thinking.settle(true), StatusLine::Thinking);
        assert_eq!(StatusLine::Thinking.settle(false), StatusLine::Ready);
    }

    #[test]
    fn idle_statuses_stay() {
        let empty = StatusLine::Rejected(SubmitError::EmptyInput);
        assert_eq!(empty.settle(false), empty);
        assert_eq!(StatusLine::Cancelled.settle(false), StatusLine::Cancelled);
    }

    #[test]
    fn rejection_text_names_the_reason() {
        assert_eq!(
            StatusLine::Rejected(SubmitError::Busy).to_string(),
            "Not sent: still waiting for the previous response"
        );
    }
}
