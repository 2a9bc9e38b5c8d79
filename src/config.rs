//! Network and timing configuration.
//!
//! Tunables for the connectivity subsystem.  Credentials are baked in at
//! build time from the `AQUAGUARD_*` environment variables; everything
//! else has a sane default.  User-editable settings (limits, timezone,
//! feeding schedule) live in the EEPROM-backed [`crate::store::ConfigStore`]
//! instead.

use serde::{Deserialize, Serialize};

/// Connectivity configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    // --- Radio ---
    /// Station SSID (1-32 printable ASCII).
    pub wifi_ssid: heapless::String<32>,
    /// WPA2 passphrase (empty for open networks, else 8-64 bytes).
    pub wifi_password: heapless::String<64>,

    // --- Broker ---
    /// Broker URI, e.g. `mqtt://192.168.0.51:1883`.
    pub broker_uri: heapless::String<96>,
    /// Device access token, sent as the MQTT username.
    pub access_token: heapless::String<64>,
    /// MQTT client identifier.
    pub client_id: heapless::String<32>,

    // --- Time ---
    /// SNTP server host name.
    pub ntp_server: heapless::String<64>,

    // --- Timing ---
    /// Telemetry publish period (milliseconds).
    pub telemetry_interval_ms: u32,
    /// Cooperative scheduler tick (milliseconds).
    pub tick_interval_ms: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: whole(option_env!("AQUAGUARD_WIFI_SSID").unwrap_or("aquarium")),
            wifi_password: bounded(option_env!("AQUAGUARD_WIFI_PASSWORD").unwrap_or("")),
            broker_uri: bounded(
                option_env!("AQUAGUARD_BROKER_URI").unwrap_or("mqtt://192.168.0.51:1883"),
            ),
            access_token: bounded(option_env!("AQUAGUARD_ACCESS_TOKEN").unwrap_or("")),
            client_id: bounded("aquaguard"),
            ntp_server: bounded("pool.ntp.org"),
            telemetry_interval_ms: 10_000, // 1 per 10 s
            tick_interval_ms: 50,          // 20 Hz
        }
    }
}

impl NetworkConfig {
    /// Range-check every field.  Returns the name of the first offending
    /// field on failure.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(1..=32).contains(&self.wifi_ssid.len()) || !is_printable_ascii(&self.wifi_ssid) {
            return Err("wifi_ssid must be 1-32 printable ASCII bytes");
        }
        if !self.wifi_password.is_empty() && self.wifi_password.len() < 8 {
            return Err("wifi_password must be empty or 8-64 bytes");
        }
        if !is_printable_ascii(&self.wifi_password) {
            return Err("wifi_password must be printable ASCII");
        }
        if self.broker_uri.is_empty() {
            return Err("broker_uri must not be empty");
        }
        if self.ntp_server.is_empty() {
            return Err("ntp_server must not be empty");
        }
        if self.telemetry_interval_ms == 0 {
            return Err("telemetry_interval_ms must be > 0");
        }
        if !(1..=1000).contains(&self.tick_interval_ms) {
            return Err("tick_interval_ms must be 1-1000");
        }
        Ok(())
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Copy `value` whole.  A value that does not fit leaves the field empty,
/// which [`NetworkConfig::validate`] then rejects.
fn whole<const N: usize>(value: &str) -> heapless::String<N> {
    heapless::String::try_from(value).unwrap_or_default()
}

/// Copy `value` into a fixed-capacity string, truncating at a char
/// boundary if it does not fit.
fn bounded<const N: usize>(value: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in value.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
