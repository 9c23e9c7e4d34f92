use regex::Regex;
use std::sync::OnceLock;

use crate::error::ConfigError;
use crate::Result;

/// Compiled regex for ISO 3166-1 alpha-2 country codes as used by the VPN client.
static COUNTRY_CODE_RE: OnceLock<Regex> = OnceLock::new();

fn country_code_re() -> &'static Regex {
    COUNTRY_CODE_RE.get_or_init(|| Regex::new(r"^[A-Z]{2}$").expect("valid country code regex"))
}

/// Returns true if `code` is two upper-case ASCII letters.
pub fn is_valid_country_code(code: &str) -> bool {
    country_code_re().is_match(code)
}

/// Validates a country code before it is passed to the VPN client.
///
/// Returns a `ConfigError::InvalidValue` on failure.
pub fn validate_country_code(code: &str) -> Result<()> {
    is_valid_country_code(code).then_some(()).ok_or_else(|| {
        ConfigError::InvalidValue {
            field: "country_code".to_string(),
            reason: format!("'{code}' is not a two-letter upper-case country code"),
        }
        .into()
    })
}
