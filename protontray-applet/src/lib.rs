pub mod menu;
pub mod notifier;
pub mod tray;
