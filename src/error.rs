//! Unified error types for the Aquarium Guardian firmware.
//!
//! Each port and subsystem has its own small, `Copy` error enum so callers
//! can match on every variant.  All of them convert into the top-level
//! [`Error`], which is what `main` bubbles up into `anyhow`.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The non-volatile byte store failed.
    Storage(StorageError),
    /// A transport link (radio or broker) failed.
    Link(LinkError),
    /// The time source rejected a request.
    TimeSync(TimeSyncError),
    /// The feeding worker could not be started.
    Feeder(FeederError),
    /// The configuration store could not persist its document.
    Config(ConfigError),
    /// The RPC registry was built incorrectly.
    Registry(RegistryError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::TimeSync(e) => write!(f, "time sync: {e}"),
            Self::Feeder(e) => write!(f, "feeder: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Registry(e) => write!(f, "rpc registry: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Byte store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The access would run past the end of the device.
    OutOfBounds { address: u16, len: usize },
    /// The bus transaction was NACKed or timed out.
    Bus,
    /// The backing device is not present (e.g. simulated hardware fault).
    Unavailable,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { address, len } => {
                write!(f, "access of {len} bytes at 0x{address:04X} out of bounds")
            }
            Self::Bus => write!(f, "bus transaction failed"),
            Self::Unavailable => write!(f, "device unavailable"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Transport link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The link is not in its connected state.
    NotConnected,
    /// The driver refused to enqueue a publish.
    PublishFailed,
    /// The driver refused a subscription.
    SubscribeFailed,
    /// SSID or password failed validation.
    InvalidCredentials,
    /// Driver-level failure (event loop, client construction, ...).
    Driver,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "link not connected"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::Driver => write!(f, "driver error"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Time source errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSyncError {
    /// Timezone is empty, too long or not printable ASCII.
    InvalidTimezone,
    /// SNTP service could not be started.
    Driver,
}

impl fmt::Display for TimeSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimezone => write!(f, "invalid POSIX timezone"),
            Self::Driver => write!(f, "SNTP driver error"),
        }
    }
}

impl From<TimeSyncError> for Error {
    fn from(e: TimeSyncError) -> Self {
        Self::TimeSync(e)
    }
}

// ---------------------------------------------------------------------------
// Feeding worker errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeederError {
    /// A feeding run is already in progress.
    Busy,
    /// Dose outside 1..=5 portions.
    InvalidDose,
    /// The worker thread could not be spawned.
    SpawnFailed,
}

impl fmt::Display for FeederError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "feeder busy"),
            Self::InvalidDose => write!(f, "invalid dose"),
            Self::SpawnFailed => write!(f, "worker spawn failed"),
        }
    }
}

impl From<FeederError> for Error {
    fn from(e: FeederError) -> Self {
        Self::Feeder(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Serialized document does not fit the persistence buffer.
    DocumentTooLarge { len: usize, max: usize },
    /// The document could not be serialized.
    Serialize,
    /// All schedule slots are taken.
    ScheduleFull,
    /// A value does not fit its field.
    InvalidValue(&'static str),
    /// The byte store rejected the write.
    Storage(StorageError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DocumentTooLarge { len, max } => {
                write!(f, "document of {len} bytes exceeds {max} byte buffer")
            }
            Self::Serialize => write!(f, "serialization failed"),
            Self::ScheduleFull => write!(f, "feeding schedule full"),
            Self::InvalidValue(msg) => write!(f, "invalid value: {msg}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// RPC registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// A handler is already registered under this method name.
    DuplicateMethod(&'static str),
    /// The registry has no free slot.
    TooManyMethods,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateMethod(name) => write!(f, "method '{name}' registered twice"),
            Self::TooManyMethods => write!(f, "method table full"),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
