pub mod backend;
pub mod config;
pub mod confirm;
pub mod dispatch;
pub mod error;
pub mod flow;
pub mod kiosk;
pub mod receipt;
pub mod scan;
pub mod status;
pub mod wedge;

pub use config::AppConfig;
pub use error::{KioskError, KioskResult};
pub use kiosk::Kiosk;
