/// Footer widgets: reply statistics per coaching topic
use crate::core::ReplyStats;
use eframe::egui;

pub const CHIP_SPACING: f32 = 6.0;

const CHIP_FILL: egui::Color32 = egui::Color32::from_rgb(239, 246, 255);
const CHIP_TEXT: egui::Color32 = egui::Color32::from_rgb(30, 64, 175);

/// Renders one "topic: count" chip per rule plus the fallback count.
pub fn draw_stats_bar(ui: &mut egui::Ui, stats: &ReplyStats, message_count: usize) {
    ui.horizontal_wrapped(|ui| {
        ui.spacing_mut().item_spacing.x = CHIP_SPACING;
        ui.label(
            egui::RichText::new(format!("💬 {message_count} messages"))
                .size(11.0)
                .color(egui::Color32::GRAY),
        );

        for (keyword, count) in &stats.replies_by_keyword {
            draw_chip(ui, keyword, *count);
        }
        draw_chip(ui, "other", stats.fallback_replies);
    });
}

fn draw_chip(ui: &mut egui::Ui, title: &str, count: usize) {
    egui::Frame::default()
        .fill(CHIP_FILL)
        .corner_radius(6.0)
        .inner_margin(egui::Margin::symmetric(6, 2))
        .show(ui, |ui| {
            ui.label(
                egui::RichText::new(format!("{title}: {count}"))
                    .size(11.0)
                    .color(CHIP_TEXT),
            );
        });
}
