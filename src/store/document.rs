//! The persisted configuration document and its field table.
//!
//! Every persisted setting is declared once in the `config_fields!` table
//! below.  A row generates the struct member, its short serialized key,
//! its default, a [`FieldId`] variant and a zero-sized marker type that
//! implements [`Field`], which is what gives the store typed `get`/`set`.
//!
//! ```text
//!  row:  timezone: Tz = "tz" => TimezoneField, default ...
//!          │            │        │
//!          │            │        └─ marker type + FieldId::TimezoneField
//!          │            └────────── JSON key in EEPROM
//!          └─────────────────────── ConfigDocument::timezone
//! ```

use serde::{Deserialize, Serialize};

/// Capacity of the feeding schedule.
pub const MAX_SCHEDULE_ENTRIES: usize = 10;
/// Minutes in a day; valid `minute` values are `0..MINUTES_PER_DAY`.
pub const MINUTES_PER_DAY: u16 = 1440;
pub const MIN_DOSE: u8 = 1;
pub const MAX_DOSE: u8 = 5;
/// Longest POSIX TZ string stored.
pub const MAX_TIMEZONE_LEN: usize = 32;
/// Accepted range for temperature limits (°C).
pub const MIN_TEMPERATURE_C: f32 = 0.0;
pub const MAX_TEMPERATURE_C: f32 = 50.0;

pub type Timezone = heapless::String<MAX_TIMEZONE_LEN>;
pub type FeedingSchedule = heapless::Vec<FeedingScheduleEntry, MAX_SCHEDULE_ENTRIES>;

/// One slot of the feeding schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedingScheduleEntry {
    #[serde(rename = "id")]
    pub slot_id: u8,
    #[serde(rename = "min")]
    pub minute_of_day: u16,
    pub dose: u8,
    #[serde(rename = "en")]
    pub enabled: bool,
}

impl FeedingScheduleEntry {
    pub fn is_valid(&self) -> bool {
        (self.slot_id as usize) < MAX_SCHEDULE_ENTRIES
            && self.minute_of_day < MINUTES_PER_DAY
            && (MIN_DOSE..=MAX_DOSE).contains(&self.dose)
    }
}

/// Water temperature alarm limits, applied as a unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureLimits {
    pub min_c: f32,
    pub min_enabled: bool,
    pub max_c: f32,
    pub max_enabled: bool,
}

impl TemperatureLimits {
    /// Both bounds in range and `min < max`.
    pub fn is_valid(&self) -> bool {
        let range = MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C;
        range.contains(&self.min_c) && range.contains(&self.max_c) && self.min_c < self.max_c
    }

    /// Both bounds snapped to 0.1 °C.  Stored limits always have this
    /// resolution, which keeps each one to at most four JSON characters.
    pub fn rounded(self) -> Self {
        let tenth = |c: f32| (c * 10.0).round() / 10.0;
        Self {
            min_c: tenth(self.min_c),
            max_c: tenth(self.max_c),
            ..self
        }
    }
}

/// 1..=32 printable ASCII characters, e.g. `CET-1CEST,M3.5.0,M10.5.0/3`.
/// `"` and `\` never occur in a POSIX TZ string and would be escaped on disk.
pub fn is_valid_timezone(tz: &str) -> bool {
    (1..=MAX_TIMEZONE_LEN).contains(&tz.len())
        && tz
            .bytes()
            .all(|b| (b.is_ascii_graphic() || b == b' ') && b != b'"' && b != b'\\')
}

/// A typed slot of [`ConfigDocument`].
pub trait Field {
    type Value: Clone + PartialEq;
    const ID: FieldId;

    fn get(doc: &ConfigDocument) -> &Self::Value;
    fn get_mut(doc: &mut ConfigDocument) -> &mut Self::Value;
}

macro_rules! config_fields {
    ($( $member:ident : $ty:ty = $key:tt => $marker:ident, default $default:expr; )+) => {
        /// The whole persisted configuration.  Missing keys take their
        /// defaults; unknown keys are ignored.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct ConfigDocument {
            $( #[serde(rename = $key)] pub $member: $ty, )+
        }

        impl Default for ConfigDocument {
            fn default() -> Self {
                Self { $( $member: $default, )+ }
            }
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum FieldId {
            $( $marker, )+
        }

        impl FieldId {
            pub const ALL: &'static [FieldId] = &[ $( FieldId::$marker, )+ ];

            /// Serialized key.
            pub const fn key(self) -> &'static str {
                match self {
                    $( FieldId::$marker => $key, )+
                }
            }
        }

        $(
            pub struct $marker;

            impl Field for $marker {
                type Value = $ty;
                const ID: FieldId = FieldId::$marker;

                fn get(doc: &ConfigDocument) -> &$ty {
                    &doc.$member
                }

                fn get_mut(doc: &mut ConfigDocument) -> &mut $ty {
                    &mut doc.$member
                }
            }
        )+
    };
}

/// Field markers, e.g. `store.get::<fields::TempMin>()`.
pub mod fields {
    pub use super::{
        FeedingScheduleField, TempMax, TempMaxEnabled, TempMin, TempMinEnabled, TimezoneField,
    };
}

config_fields! {
    timezone: Timezone = "tz" => TimezoneField, default default_timezone();
    temp_min: f32 = "tMin" => TempMin, default 20.0;
    temp_min_enabled: bool = "tMinEn" => TempMinEnabled, default false;
    temp_max: f32 = "tMax" => TempMax, default 28.0;
    temp_max_enabled: bool = "tMaxEn" => TempMaxEnabled, default false;
    feeding_schedule: FeedingSchedule = "fs" => FeedingScheduleField, default FeedingSchedule::new();
}

fn default_timezone() -> Timezone {
    let mut tz = Timezone::new();
    let _ = tz.push_str("UTC0");
    tz
}

impl ConfigDocument {
    pub fn temperature_limits(&self) -> TemperatureLimits {
        TemperatureLimits {
            min_c: self.temp_min,
            min_enabled: self.temp_min_enabled,
            max_c: self.temp_max,
            max_enabled: self.temp_max_enabled,
        }
    }

    /// Every field in range and slot ids unique.
    pub fn is_valid(&self) -> bool {
        let schedule = &self.feeding_schedule;
        is_valid_timezone(&self.timezone)
            && self.temperature_limits().is_valid()
            && schedule.iter().all(FeedingScheduleEntry::is_valid)
            && schedule
                .iter()
                .enumerate()
                .all(|(i, a)| schedule[i + 1..].iter().all(|b| b.slot_id != a.slot_id))
    }
}
