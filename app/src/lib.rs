//! Watermark editor: session state, panel state, configuration and the
//! glue between them and the rendering engine.

pub mod config;
pub mod fonts;
pub mod panel;
pub mod session;
pub mod settings;

pub use config::AppConfig;
pub use panel::{PanelEntry, PanelState};
pub use session::{EditorSession, LoadStatus, PendingLoad, SessionError, check_image_file};
pub use settings::{SettingsError, WatermarkSettings};
