//! Startup configuration consumed from the platform's persisted store.
//!
//! The bridge itself only reads these values once at startup; writing them
//! (and the console commands doing so) is the platform's business. The
//! stored power-save string uses the reference firmware's spelling.

use heapless::String;

/// Maximum SSID length.
pub const MAX_SSID_LEN: usize = 32;
/// Maximum passphrase length.
pub const MAX_PASSPHRASE_LEN: usize = 64;

const DEFAULT_SSID: &str = "defaultssid";
const DEFAULT_PASSPHRASE: &str = "defaultpass";

/// Station power-save mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PowerSave {
    /// Power saving disabled.
    #[default]
    None,
    /// Minimum modem power saving.
    MinModem,
    /// Maximum modem power saving.
    MaxModem,
}
impl PowerSave {
    /// Parse the stored power-save string, case-insensitively.
    ///
    /// An absent or garbage value maps to [PowerSave::None], matching the
    /// reference firmware.
    pub fn from_stored(value: &str) -> Self {
        if value.eq_ignore_ascii_case("wifi_ps_min_modem") {
            Self::MinModem
        } else if value.eq_ignore_ascii_case("wifi_ps_max_modem") {
            Self::MaxModem
        } else {
            Self::None
        }
    }
}

/// Credentials and power-save mode for the station interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StationConfig {
    /// Network name to associate with.
    pub ssid: String<MAX_SSID_LEN>,
    /// WPA2 passphrase.
    pub passphrase: String<MAX_PASSPHRASE_LEN>,
    /// Modem power-save mode.
    pub power_save: PowerSave,
}
impl Default for StationConfig {
    fn default() -> Self {
        Self {
            ssid: String::try_from(DEFAULT_SSID).unwrap_or_default(),
            passphrase: String::try_from(DEFAULT_PASSPHRASE).unwrap_or_default(),
            power_save: PowerSave::None,
        }
    }
}

/// Read-only access to the persisted station configuration.
///
/// Implemented by the platform over whatever storage it has. A missing store
/// should yield [StationConfig::default].
pub trait ConfigStore {
    /// Error reported by the underlying storage.
    type Error;
    /// Load the stored configuration.
    fn load(&mut self) -> Result<StationConfig, Self::Error>;
}
