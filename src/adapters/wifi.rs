//! WiFi station-mode adapter.
//!
//! Implements [`RadioLink`] on top of the shared
//! [`LinkStateMachine`](super::link_state::LinkStateMachine).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::EspWifi` with
//!   system event loop subscriptions.  `start()` only issues the
//!   non-blocking connect; association is reported by the event loop.
//! - **all other targets**: simulation backend driven by a [`SimRadio`]
//!   handle, for host-side tests.
//!
//! ## Event callbacks
//!
//! Event loop callbacks run on the ESP-IDF event task.  They store the
//! connected flag and push `LinkEvent::RadioUp` / `LinkEvent::RadioDown`,
//! nothing else.  No reconnection here: a failed or dropped link
//! surfaces as `Error`, and the orchestrator decides whether to call
//! `start()` again.

use std::sync::Arc;

use log::{info, warn};

use crate::app::ports::RadioLink;
use crate::error::LinkError;

use super::link_state::{LinkFlags, LinkState, LinkStateMachine};

/// Radio sub-state.
pub type RadioState = LinkState;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// SSID 1–32 printable ASCII bytes; password empty (open) or 8–64 bytes.
pub fn validate_credentials(ssid: &str, password: &str) -> Result<(), LinkError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(LinkError::InvalidCredentials);
    }
    if !password.is_empty() && !(8..=64).contains(&password.len()) {
        return Err(LinkError::InvalidCredentials);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi link
// ───────────────────────────────────────────────────────────────

pub struct WifiLink {
    machine: LinkStateMachine,
    flags: Arc<LinkFlags>,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    #[cfg(target_os = "espidf")]
    driver: esp::Driver,
    #[cfg(not(target_os = "espidf"))]
    sim: SimRadio,
}

impl WifiLink {
    pub fn state(&self) -> RadioState {
        self.machine.state()
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    fn bounded_credentials(
        ssid: &str,
        password: &str,
    ) -> Result<(heapless::String<32>, heapless::String<64>), LinkError> {
        validate_credentials(ssid, password)?;
        let ssid = heapless::String::try_from(ssid).map_err(|()| LinkError::InvalidCredentials)?;
        let password =
            heapless::String::try_from(password).map_err(|()| LinkError::InvalidCredentials)?;
        Ok((ssid, password))
    }
}

impl RadioLink for WifiLink {
    fn start(&mut self) {
        if !self.machine.begin_connect(&self.flags) {
            return;
        }
        if let Err(e) = self.platform_connect() {
            warn!("WiFi: connect to '{}' failed: {}", self.ssid, e);
            self.machine.connect_refused();
        }
    }

    fn update(&mut self) {
        self.machine.update(&self.flags);
    }

    fn is_connected(&self) -> bool {
        self.machine.is_connected()
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF backend
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
    use esp_idf_svc::wifi::EspWifi;

    pub struct Driver {
        pub wifi: EspWifi<'static>,
        pub _wifi_events: EspSubscription<'static, System>,
        pub _ip_events: EspSubscription<'static, System>,
        pub _sysloop: EspSystemEventLoop,
    }
}

#[cfg(target_os = "espidf")]
impl WifiLink {
    /// Wrap an initialised `EspWifi` driver.  `events` receives
    /// `RadioUp`/`RadioDown` from the event loop.
    pub fn new(
        wifi: esp_idf_svc::wifi::EspWifi<'static>,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
        ssid: &str,
        password: &str,
        events: &'static crate::events::EventQueue,
    ) -> Result<Self, LinkError> {
        use esp_idf_svc::netif::IpEvent;
        use esp_idf_svc::wifi::WifiEvent;

        use crate::events::LinkEvent;

        let (ssid, password) = Self::bounded_credentials(ssid, password)?;
        let flags = Arc::new(LinkFlags::new());

        let wifi_flags = flags.clone();
        let wifi_events = sysloop
            .subscribe::<WifiEvent, _>(move |event| {
                if let WifiEvent::StaDisconnected(_) = event {
                    if wifi_flags.is_connected() {
                        wifi_flags.set_connected(false);
                        events.push(LinkEvent::RadioDown);
                    } else {
                        wifi_flags.set_failed();
                    }
                }
            })
            .map_err(|_| LinkError::Driver)?;

        let ip_flags = flags.clone();
        let ip_events = sysloop
            .subscribe::<IpEvent, _>(move |event| {
                if let IpEvent::DhcpIpAssigned(_) = event {
                    ip_flags.set_connected(true);
                    events.push(LinkEvent::RadioUp);
                }
            })
            .map_err(|_| LinkError::Driver)?;

        Ok(Self {
            machine: LinkStateMachine::new("WiFi"),
            flags,
            ssid,
            password,
            driver: esp::Driver {
                wifi,
                _wifi_events: wifi_events,
                _ip_events: ip_events,
                _sysloop: sysloop,
            },
        })
    }

    fn platform_connect(&mut self) -> Result<(), LinkError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: self.ssid.as_str().try_into().map_err(|_| LinkError::InvalidCredentials)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| LinkError::InvalidCredentials)?,
            auth_method,
            ..Default::default()
        });

        let wifi = &mut self.driver.wifi;
        wifi.set_configuration(&config).map_err(|_| LinkError::Driver)?;
        if !wifi.is_started().unwrap_or(false) {
            wifi.start().map_err(|_| LinkError::Driver)?;
        }
        wifi.connect().map_err(|_| LinkError::Driver)?;
        info!("WiFi(espidf): association with '{}' requested", self.ssid);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation backend
// ───────────────────────────────────────────────────────────────

/// Test handle for a simulated radio.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Default)]
pub struct SimRadio {
    flags: Arc<LinkFlags>,
    reject: Arc<core::sync::atomic::AtomicBool>,
    connects: Arc<core::sync::atomic::AtomicU32>,
}

#[cfg(not(target_os = "espidf"))]
impl SimRadio {
    /// Drop the association, as a deauth from the AP would.
    pub fn drop_link(&self) {
        self.flags.set_connected(false);
    }

    /// Make the next connect attempts fail.
    pub fn reject_connects(&self, reject: bool) {
        self.reject.store(reject, core::sync::atomic::Ordering::Relaxed);
    }

    /// Number of connect requests issued to the driver.
    pub fn connect_count(&self) -> u32 {
        self.connects.load(core::sync::atomic::Ordering::Relaxed)
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiLink {
    /// A simulated link plus the handle that controls it.
    pub fn simulated(ssid: &str, password: &str) -> Result<(Self, SimRadio), LinkError> {
        let (ssid, password) = Self::bounded_credentials(ssid, password)?;
        let sim = SimRadio::default();
        let link = Self {
            machine: LinkStateMachine::new("WiFi"),
            flags: sim.flags.clone(),
            ssid,
            password,
            sim: sim.clone(),
        };
        Ok((link, sim))
    }

    fn platform_connect(&mut self) -> Result<(), LinkError> {
        use core::sync::atomic::Ordering;

        self.sim.connects.fetch_add(1, Ordering::Relaxed);
        if self.sim.reject.load(Ordering::Relaxed) {
            warn!("WiFi(sim): association with '{}' rejected", self.ssid);
            self.flags.set_failed();
        } else {
            info!("WiFi(sim): associated with '{}'", self.ssid);
            self.flags.set_connected(true);
        }
        Ok(())
    }
}
