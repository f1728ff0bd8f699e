use anyhow::Context;
use coach_chat::config::Config;
use coach_chat::core::ChatSession;
use coach_chat::logger;
use coach_chat::ui::CoachApp;
use eframe::NativeOptions;

fn main() -> anyhow::Result<()> {
    logger::init();
    log::info!("🚀 Coach chat starting");

    // Session replies are scheduled on this runtime
    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let _guard = rt.enter();

    let config = Config::default();
    log::info!("📁 Configuration loaded");

    let session = ChatSession::new(config.session.clone()).context("invalid session configuration")?;
    let title = config.coach_name.clone();

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_min_inner_size([420.0, 360.0])
            .with_title(title.clone()),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| -> Result<Box<dyn eframe::App>, Box<dyn std::error::Error + Send + Sync>> {
            Ok(Box::new(CoachApp::new(config, session)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("UI error: {e}"))?;

    log::info!("👋 Coach chat closed");
    Ok(())
}
