//! UI layer for the profile desktop app.

pub mod app;

pub use app::{DesktopGuiApp, StartupConfig};
