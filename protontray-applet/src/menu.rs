use protontray::applet::UserAction;
use protontray::dispatch::Action;
use protontray::servers::ServerDirectory;
use protontray::vpn::ConnectTarget;

/// One entry of the tray context menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuEntry {
    Item { label: String, action: UserAction },
    /// A checkable item reflecting whether notifications are shown
    NotificationToggle { label: String },
    Submenu { label: String, entries: Vec<MenuEntry> },
    Separator,
}

impl MenuEntry {
    fn item(label: &str, action: UserAction) -> Self {
        MenuEntry::Item {
            label: label.to_string(),
            action,
        }
    }

    fn connect(label: &str, target: ConnectTarget) -> Self {
        Self::item(label, UserAction::Run(Action::Connect(target)))
    }
}

/// The static layout of the tray menu, built once at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MenuModel {
    entries: Vec<MenuEntry>,
}

impl MenuModel {
    /// Builds the menu. The country submenu is only present if `servers` lists any country.
    pub fn new(servers: &ServerDirectory) -> Self {
        let mut connect = vec![MenuEntry::connect("Fastest", ConnectTarget::Fastest)];

        let countries: Vec<MenuEntry> = servers
            .countries()
            .into_iter()
            .map(|country| MenuEntry::connect(&country.name, ConnectTarget::Country(country.code)))
            .collect();
        if !countries.is_empty() {
            connect.push(MenuEntry::Submenu {
                label: "Country".to_string(),
                entries: countries,
            });
        }

        connect.extend([
            MenuEntry::connect("Random", ConnectTarget::Random),
            MenuEntry::connect("Secure Core", ConnectTarget::SecureCore),
            MenuEntry::connect("P2P", ConnectTarget::P2p),
            MenuEntry::connect("Tor", ConnectTarget::Tor),
        ]);

        let entries = vec![
            MenuEntry::Submenu {
                label: "Connect".to_string(),
                entries: connect,
            },
            MenuEntry::item("Disconnect", UserAction::Run(Action::Disconnect)),
            MenuEntry::item("Reconnect", UserAction::Run(Action::Reconnect)),
            MenuEntry::item("Status", UserAction::Run(Action::CheckStatus)),
            MenuEntry::Separator,
            MenuEntry::NotificationToggle {
                label: "Show Notifications".to_string(),
            },
            MenuEntry::Separator,
            MenuEntry::item("About ProtonVPN", UserAction::Run(Action::ShowVersion)),
            MenuEntry::item("About ProtonVPN-Applet", UserAction::AboutApplet),
            MenuEntry::item("Exit", UserAction::Quit),
        ];

        Self { entries }
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }
}
