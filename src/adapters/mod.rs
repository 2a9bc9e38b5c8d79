//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements              | Connects to                  |
//! |-------------|-------------------------|------------------------------|
//! | `wifi`      | RadioLink               | ESP-IDF WiFi STA             |
//! | `mqtt`      | MessageLink             | ESP-IDF MQTT client          |
//! | `sntp`      | TimeSync                | ESP-IDF SNTP + libc TZ       |
//! | `eeprom`    | ByteStore               | AT24C32 over I2C             |
//! | `feeder`    | FeederPort              | Servo on LEDC, worker thread |
//! | `hardware`  | TemperatureProvider     | Shared sensor readings       |
//! | `guardian`  | DeviceServices          | Store, feeder, readings      |
//! | `log_sink`  | EventSink               | Serial log output            |
//! | `time`      | (monotonic uptime)      | ESP32 system timer           |
//!
//! Link adapters share the connection sub-state machine in `link_state`.
//! Every hardware backend is gated on `target_os = "espidf"` with a host
//! simulation in the same file.

pub mod eeprom;
pub mod feeder;
pub mod guardian;
pub mod hardware;
pub mod link_state;
pub mod log_sink;
pub mod mqtt;
pub mod sntp;
pub mod time;
pub mod wifi;
