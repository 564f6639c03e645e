//! Configuration and settings management.

mod settings;
mod xdg;

pub use settings::{Settings, SettingsError, DEFAULT_API_URL, DEFAULT_SOCKET_URL};
pub use xdg::XdgDirs;
