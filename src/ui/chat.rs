/// Chat transcript rendering and input handling
use crate::config::StarterPrompt;
use crate::core::Message;
use eframe::egui;

/// Constants for chat styling
pub const BUBBLE_MAX_WIDTH: f32 = 420.0;
pub const BUBBLE_ROUNDING: f32 = 8.0;
pub const BUBBLE_MARGIN: f32 = 8.0;
pub const INPUT_HEIGHT: f32 = 30.0;
pub const SEND_BUTTON_WIDTH: f32 = 70.0;
pub const DOT_RADIUS: f32 = 4.0;

const USER_BUBBLE: egui::Color32 = egui::Color32::from_rgb(37, 99, 235);
const ASSISTANT_BUBBLE: egui::Color32 = egui::Color32::from_rgb(243, 244, 246);
const ASSISTANT_TEXT: egui::Color32 = egui::Color32::from_rgb(17, 24, 39);
const MUTED_TEXT: egui::Color32 = egui::Color32::from_rgb(107, 114, 128);

/// Renders the transcript, oldest first, followed by the thinking indicator.
///
/// # Arguments
/// * `ui` - The ui to draw into
/// * `messages` - Snapshot of the session history
/// * `coach_name` - Label for assistant messages
/// * `is_thinking` - Whether a reply is pending
pub fn draw_messages(ui: &mut egui::Ui, messages: &[Message], coach_name: &str, is_thinking: bool) {
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for message in messages {
                draw_message(ui, message, coach_name);
                ui.add_space(6.0);
            }

            if is_thinking {
                draw_thinking_indicator(ui);
            }
        });
}

fn draw_message(ui: &mut egui::Ui, message: &Message, coach_name: &str) {
    let is_user = message.is_user();

    let (fill, text_color, sender, layout) = if is_user {
        (
            USER_BUBBLE,
            egui::Color32::WHITE,
            "You",
            egui::Layout::right_to_left(egui::Align::Min),
        )
    } else {
        (
            ASSISTANT_BUBBLE,
            ASSISTANT_TEXT,
            coach_name,
            egui::Layout::left_to_right(egui::Align::Min),
        )
    };

    let timestamp = message
        .created_at()
        .with_timezone(&chrono::Local)
        .format("%H:%M:%S")
        .to_string();

    ui.with_layout(layout, |ui| {
        egui::Frame::default()
            .fill(fill)
            .corner_radius(BUBBLE_ROUNDING)
            .inner_margin(BUBBLE_MARGIN)
            .show(ui, |ui| {
                ui.set_max_width(BUBBLE_MAX_WIDTH);
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new(sender).size(10.0).color(text_color).strong());
                    ui.label(egui::RichText::new(message.content()).size(13.0).color(text_color));
                    ui.label(egui::RichText::new(timestamp).size(9.0).color(text_color.gamma_multiply(0.75)));
                });
            });
    });
}

/// Three bouncing dots in an assistant-coloured bubble
pub fn draw_thinking_indicator(ui: &mut egui::Ui) {
    let time = ui.input(|i| i.time) as f32;

    egui::Frame::default()
        .fill(ASSISTANT_BUBBLE)
        .corner_radius(BUBBLE_ROUNDING)
        .inner_margin(BUBBLE_MARGIN)
        .show(ui, |ui| {
            let (rect, _) = ui.allocate_exact_size(egui::vec2(44.0, 16.0), egui::Sense::hover());
            let painter = ui.painter();

            for i in 0..3 {
                // Each dot trails the previous one by 0.1 s
                let phase = (time * 6.0 - i as f32 * 0.6).sin().max(0.0);
                let center = egui::pos2(
                    rect.min.x + DOT_RADIUS + 2.0 + i as f32 * 14.0,
                    rect.center().y + 3.0 - phase * 5.0,
                );
                painter.circle_filled(center, DOT_RADIUS, MUTED_TEXT);
            }
        });
}

/// Renders the suggestion buttons for an empty conversation.
///
/// Returns the prompt of the clicked button, if any.
pub fn draw_starter_prompts(ui: &mut egui::Ui, prompts: &[StarterPrompt]) -> Option<String> {
    let mut chosen = None;

    ui.vertical_centered(|ui| {
        ui.add_space(40.0);
        ui.label(egui::RichText::new("🧠").size(40.0));
        ui.label(egui::RichText::new("Start a conversation! Try asking about:").color(MUTED_TEXT));
        ui.add_space(12.0);

        egui::Grid::new("starter_prompts")
            .num_columns(2)
            .spacing([8.0, 8.0])
            .show(ui, |ui| {
                for (i, prompt) in prompts.iter().enumerate() {
                    if ui.button(prompt.label.as_str()).clicked() {
                        chosen = Some(prompt.prompt.clone());
                    }
                    if i % 2 == 1 {
                        ui.end_row();
                    }
                }
            });
    });

    chosen
}

/// Renders the input row; returns true if the user asked to send
/// (Enter in the text field or the Send button).
pub fn draw_input_row(ui: &mut egui::Ui, input_text: &mut String, is_thinking: bool) -> bool {
    let mut send = false;

    ui.horizontal(|ui| {
        let input_width = (ui.available_width() - SEND_BUTTON_WIDTH - 8.0).max(80.0);
        let response = ui.add_sized(
            [input_width, INPUT_HEIGHT],
            egui::TextEdit::singleline(input_text).hint_text("Ask me anything..."),
        );

        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            send = true;
            response.request_focus();
        }

        let button = egui::Button::new(egui::RichText::new("Send").color(egui::Color32::WHITE))
            .fill(USER_BUBBLE);
        if ui
            .add_enabled(!is_thinking, button.min_size(egui::vec2(SEND_BUTTON_WIDTH, INPUT_HEIGHT)))
            .clicked()
        {
            send = true;
        }
    });

    send
}
