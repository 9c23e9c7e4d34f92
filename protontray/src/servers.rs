//! The server list cached by the VPN client, used to offer per-country connections.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::ServerDirectoryError;
use crate::validation::is_valid_country_code;
use crate::Result;

/// One logical server as listed by the VPN client.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerRecord {
    pub name: String,
    pub exit_country: String,
    #[serde(default)]
    pub entry_country: Option<String>,
    #[serde(default)]
    pub tier: Option<u8>,
    /// Feature bit set (Secure Core, Tor, P2P, ...)
    #[serde(default)]
    pub features: u32,
    #[serde(default)]
    pub load: Option<u8>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServerList {
    #[serde(default)]
    logical_servers: Vec<ServerRecord>,
}

/// An exit country offered in the tray menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Country {
    pub code: String,
    pub name: String,
}

/// Read-only snapshot of the server list, taken at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerDirectory {
    servers: Vec<ServerRecord>,
}

impl ServerDirectory {
    pub fn new(servers: Vec<ServerRecord>) -> Self {
        Self { servers }
    }

    /// Parses the client's `{"LogicalServers": [...]}` document.
    pub fn from_json(json: &str) -> Result<Self> {
        let list: ServerList = serde_json::from_str(json).map_err(ServerDirectoryError::from)?;
        Ok(Self::new(list.logical_servers))
    }

    /// Reads the server list at `path`.
    ///
    /// ### Arguments
    /// - `path` - the client's cached server list
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|_| ServerDirectoryError::NotReadable {
            path: path.to_path_buf(),
        })?;
        let directory = Self::from_json(&json)?;
        debug!(
            "Loaded {} servers from {}",
            directory.servers.len(),
            path.display()
        );

        Ok(directory)
    }

    /// Like `load`, but yields an empty directory if the list cannot be read.
    pub fn load_or_empty(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("Country selection unavailable: {e}");
            Self::default()
        })
    }

    pub fn servers(&self) -> &[ServerRecord] {
        &self.servers
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Distinct exit countries, sorted by display name.
    ///
    /// Servers with a malformed country code are skipped.
    pub fn countries(&self) -> Vec<Country> {
        let codes: BTreeSet<&str> = self
            .servers
            .iter()
            .map(|server| server.exit_country.as_str())
            .filter(|code| is_valid_country_code(code))
            .collect();

        let mut countries: Vec<Country> = codes
            .into_iter()
            .map(|code| Country {
                code: code.to_string(),
                name: country_name(code).to_string(),
            })
            .collect();
        countries.sort_by(|a, b| a.name.cmp(&b.name));

        countries
    }
}

/// English name of an ISO 3166-1 alpha-2 code, or the code itself if unknown.
pub fn country_name(code: &str) -> &str {
    COUNTRY_NAMES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("AE", "United Arab Emirates"),
    ("AR", "Argentina"),
    ("AT", "Austria"),
    ("AU", "Australia"),
    ("BE", "Belgium"),
    ("BG", "Bulgaria"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CH", "Switzerland"),
    ("CL", "Chile"),
    ("CO", "Colombia"),
    ("CR", "Costa Rica"),
    ("CY", "Cyprus"),
    ("CZ", "Czechia"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("EE", "Estonia"),
    ("ES", "Spain"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("GE", "Georgia"),
    ("GR", "Greece"),
    ("HK", "Hong Kong"),
    ("HR", "Croatia"),
    ("HU", "Hungary"),
    ("IE", "Ireland"),
    ("IL", "Israel"),
    ("IN", "India"),
    ("IS", "Iceland"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("LT", "Lithuania"),
    ("LU", "Luxembourg"),
    ("LV", "Latvia"),
    ("MD", "Moldova"),
    ("MX", "Mexico"),
    ("MY", "Malaysia"),
    ("NG", "Nigeria"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("NZ", "New Zealand"),
    ("PE", "Peru"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("RO", "Romania"),
    ("RS", "Serbia"),
    ("SE", "Sweden"),
    ("SG", "Singapore"),
    ("SI", "Slovenia"),
    ("SK", "Slovakia"),
    ("TR", "Turkey"),
    ("TW", "Taiwan"),
    ("UA", "Ukraine"),
    ("UK", "United Kingdom"),
    ("US", "United States"),
    ("VN", "Vietnam"),
    ("ZA", "South Africa"),
];

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_LIST: &str = r#"{
        "Code": 1000,
        "LogicalServers": [
            {"Name": "CH#1", "EntryCountry": "CH", "ExitCountry": "CH", "Tier": 2, "Features": 0, "Load": 12},
            {"Name": "CH-DE#1", "EntryCountry": "CH", "ExitCountry": "DE", "Tier": 2, "Features": 1, "Load": 40},
            {"Name": "DE#4", "EntryCountry": "DE", "ExitCountry": "DE", "Tier": 1, "Features": 4, "Load": 71},
            {"Name": "XX#1", "ExitCountry": "xx"},
            {"Name": "IS#2", "ExitCountry": "IS"}
        ]
    }"#;

    #[test]
    fn parses_client_server_list() {
        let directory = ServerDirectory::from_json(SERVER_LIST).expect("valid server list");

        assert_eq!(directory.servers().len(), 5);
        let secure_core = &directory.servers()[1];
        assert_eq!(secure_core.name, "CH-DE#1");
        assert_eq!(secure_core.entry_country.as_deref(), Some("CH"));
        assert_eq!(secure_core.features, 1);
        assert_eq!(directory.servers()[4].load, None);
    }

    #[test]
    fn countries_are_distinct_valid_and_sorted_by_name() {
        let directory = ServerDirectory::from_json(SERVER_LIST).expect("valid server list");

        let countries: Vec<(String, String)> = directory
            .countries()
            .into_iter()
            .map(|c| (c.code, c.name))
            .collect();

        assert_eq!(
            countries,
            vec![
                ("DE".to_string(), "Germany".to_string()),
                ("IS".to_string(), "Iceland".to_string()),
                ("CH".to_string(), "Switzerland".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_codes_fall_back_to_the_code() {
        assert_eq!(country_name("ZZ"), "ZZ");
        assert_eq!(country_name("NL"), "Netherlands");
    }

    #[test]
    fn malformed_list_is_an_error() {
        assert!(ServerDirectory::from_json("{\"LogicalServers\": 3}").is_err());
    }

    #[test]
    fn missing_file_yields_empty_directory() {
        let directory =
            ServerDirectory::load_or_empty(Path::new("/nonexistent/pvpn/serverinfo.json"));
        assert!(directory.is_empty());
        assert!(directory.countries().is_empty());
    }
}
