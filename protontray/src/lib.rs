pub mod applet;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod instance;
pub mod poll;
pub mod servers;
pub mod status;
pub mod utils;
pub mod validation;
pub mod vpn;

pub use error::{AppletError, Result};
