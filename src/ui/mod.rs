pub mod app;
pub mod chat;
pub mod widgets;

pub use app::CoachApp;
