use ksni::menu::{CheckmarkItem, MenuItem, StandardItem, SubMenu};
use ksni::{ToolTip, Tray};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use protontray::applet::{AppletEvent, StatusView, UserAction};
use protontray::config::TrayConfig;
use protontray::constants::APPLET_NAME;
use protontray::status::ConnectionStatus;

use crate::menu::{MenuEntry, MenuModel};

/// StatusNotifierItem rendering of the applet.
///
/// Menu clicks are forwarded to the applet context as `AppletEvent::User`.
pub struct AppletTray {
    status: ConnectionStatus,
    notifications_enabled: bool,
    menu: MenuModel,
    icons: TrayConfig,
    events: UnboundedSender<AppletEvent>,
}

impl AppletTray {
    pub fn new(menu: MenuModel, icons: TrayConfig, events: UnboundedSender<AppletEvent>) -> Self {
        Self {
            status: ConnectionStatus::Unknown,
            notifications_enabled: false,
            menu,
            icons,
            events,
        }
    }

    fn send(&self, action: UserAction) {
        if self.events.send(AppletEvent::User(action)).is_err() {
            warn!("Applet is no longer running, ignoring menu click");
        }
    }

    fn menu_item(&self, entry: &MenuEntry) -> MenuItem<Self> {
        match entry {
            MenuEntry::Item { label, action } => {
                let action = action.clone();
                StandardItem {
                    label: label.clone(),
                    activate: Box::new(move |tray: &mut Self| tray.send(action.clone())),
                    ..Default::default()
                }
                .into()
            }
            MenuEntry::NotificationToggle { label } => CheckmarkItem {
                label: label.clone(),
                checked: self.notifications_enabled,
                activate: Box::new(|tray: &mut Self| tray.send(UserAction::ToggleNotifications)),
                ..Default::default()
            }
            .into(),
            MenuEntry::Submenu { label, entries } => SubMenu {
                label: label.clone(),
                submenu: entries.iter().map(|entry| self.menu_item(entry)).collect(),
                ..Default::default()
            }
            .into(),
            MenuEntry::Separator => MenuItem::Separator,
        }
    }
}

impl Tray for AppletTray {
    fn id(&self) -> String {
        "protontray".to_string()
    }

    fn title(&self) -> String {
        APPLET_NAME.to_string()
    }

    fn icon_name(&self) -> String {
        if self.status.is_connected() {
            self.icons.connected_icon.clone()
        } else {
            self.icons.disconnected_icon.clone()
        }
    }

    fn tool_tip(&self) -> ToolTip {
        ToolTip {
            title: APPLET_NAME.to_string(),
            description: format!("VPN {}", self.status),
            ..Default::default()
        }
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        self.menu
            .entries()
            .iter()
            .map(|entry| self.menu_item(entry))
            .collect()
    }
}

/// Pushes applet state changes to the running tray service.
pub struct TrayHandle(ksni::Handle<AppletTray>);

impl TrayHandle {
    pub fn new(handle: ksni::Handle<AppletTray>) -> Self {
        Self(handle)
    }

    pub fn shutdown(&self) {
        self.0.shutdown();
    }
}

impl StatusView for TrayHandle {
    fn show_status(&self, status: ConnectionStatus) {
        self.0.update(|tray: &mut AppletTray| tray.status = status);
    }

    fn show_notifications_enabled(&self, enabled: bool) {
        self.0
            .update(|tray: &mut AppletTray| tray.notifications_enabled = enabled);
    }
}
