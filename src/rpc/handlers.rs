//! Built-in RPC methods.
//!
//! | Method                  | Params                                  |
//! |-------------------------|-----------------------------------------|
//! | `setTempLimits`         | `min`, `max`, `min_enabled`, `max_enabled` |
//! | `addFeedingSchedule`    | `slot_id`, `minute`, `dose`, `enabled`  |
//! | `deleteFeedingSchedule` | `slot_id`                               |
//! | `feedNow`               | `dose`                                  |
//! | `setTimezone`           | `timezone`                              |
//!
//! Every handler validates all of its params before touching `ctx`.

use crate::app::ports::RpcContext;
use crate::error::{ConfigError, FeederError, RegistryError};
use crate::store::document::{
    FeedingScheduleEntry, MAX_DOSE, MAX_SCHEDULE_ENTRIES, MIN_DOSE, MINUTES_PER_DAY,
    TemperatureLimits, is_valid_timezone,
};

use super::dispatcher::{RpcDispatcher, RpcHandler};
use super::request::RpcRequest;
use super::response::RpcResult;

pub const SET_TEMP_LIMITS: &str = "setTempLimits";
pub const ADD_FEEDING_SCHEDULE: &str = "addFeedingSchedule";
pub const DELETE_FEEDING_SCHEDULE: &str = "deleteFeedingSchedule";
pub const FEED_NOW: &str = "feedNow";
pub const SET_TIMEZONE: &str = "setTimezone";

pub const FEEDER_BUSY_MESSAGE: &str = "Feeding in progress, device busy.";
pub const FEEDING_STARTED_MESSAGE: &str = "Feeding process started.";

/// A dispatcher with all five built-in methods.
pub fn builtin_dispatcher() -> Result<RpcDispatcher, RegistryError> {
    Ok(RpcDispatcher::builder()
        .register(SET_TEMP_LIMITS, SetTempLimits)?
        .register(ADD_FEEDING_SCHEDULE, AddFeedingSchedule)?
        .register(DELETE_FEEDING_SCHEDULE, DeleteFeedingSchedule)?
        .register(FEED_NOW, FeedNow)?
        .register(SET_TIMEZONE, SetTimezone)?
        .build())
}

/// Map a store failure after a valid request onto a response.
fn store_failure(what: &str, e: ConfigError) -> RpcResult {
    match e {
        ConfigError::ScheduleFull => RpcResult::error("Feeding schedule full."),
        ConfigError::InvalidValue(msg) => RpcResult::error(format!("Invalid value: {msg}.")),
        other => RpcResult::error(format!("{what} applied but not persisted ({other}).")),
    }
}

fn slot_id(request: &RpcRequest) -> Option<u8> {
    request
        .uint("slot_id")
        .filter(|&id| id < MAX_SCHEDULE_ENTRIES as u64)
        .map(|id| id as u8)
}

fn dose(request: &RpcRequest) -> Option<u8> {
    request
        .uint("dose")
        .filter(|d| (u64::from(MIN_DOSE)..=u64::from(MAX_DOSE)).contains(d))
        .map(|d| d as u8)
}

// ───────────────────────────────────────────────────────────────
// setTempLimits
// ───────────────────────────────────────────────────────────────

pub struct SetTempLimits;

impl RpcHandler for SetTempLimits {
    fn handle(&self, request: &RpcRequest, ctx: &mut dyn RpcContext) -> RpcResult {
        let (Some(min), Some(max)) = (request.number("min"), request.number("max")) else {
            return RpcResult::error("Error in temperature limit parameters.");
        };
        let (Some(min_enabled), Some(max_enabled)) =
            (request.flag("min_enabled"), request.flag("max_enabled"))
        else {
            return RpcResult::error("Error in temperature limit enable flags.");
        };

        let limits = TemperatureLimits {
            min_c: min as f32,
            min_enabled,
            max_c: max as f32,
            max_enabled,
        }
        .rounded();
        if !limits.is_valid() {
            return RpcResult::error("Invalid temperature limits: need 0 <= min < max <= 50.");
        }

        match ctx.set_temperature_limits(limits) {
            Ok(()) => RpcResult::success_with("Temperature limits updated."),
            Err(e) => store_failure("Temperature limits", e),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// addFeedingSchedule / deleteFeedingSchedule
// ───────────────────────────────────────────────────────────────

pub struct AddFeedingSchedule;

impl RpcHandler for AddFeedingSchedule {
    fn handle(&self, request: &RpcRequest, ctx: &mut dyn RpcContext) -> RpcResult {
        let Some(slot_id) = slot_id(request) else {
            return RpcResult::error("Invalid slot_id (0-9).");
        };
        let Some(minute_of_day) = request
            .uint("minute")
            .filter(|&m| m < u64::from(MINUTES_PER_DAY))
            .map(|m| m as u16)
        else {
            return RpcResult::error("Invalid minute (0-1439).");
        };
        let Some(dose) = dose(request) else {
            return RpcResult::error("Invalid dose (1-5).");
        };
        let Some(enabled) = request.flag("enabled") else {
            return RpcResult::error("Missing or invalid 'enabled' flag.");
        };

        let entry = FeedingScheduleEntry {
            slot_id,
            minute_of_day,
            dose,
            enabled,
        };
        match ctx.upsert_schedule_entry(entry) {
            Ok(()) => RpcResult::success_with("Feeding schedule added successfully."),
            Err(e) => store_failure("Feeding schedule", e),
        }
    }
}

pub struct DeleteFeedingSchedule;

impl RpcHandler for DeleteFeedingSchedule {
    fn handle(&self, request: &RpcRequest, ctx: &mut dyn RpcContext) -> RpcResult {
        let Some(slot_id) = slot_id(request) else {
            return RpcResult::error("Invalid slot_id (0-9).");
        };
        match ctx.remove_schedule_entry(slot_id) {
            Ok(()) => RpcResult::success_with("Feeding schedule deleted successfully."),
            Err(e) => store_failure("Feeding schedule", e),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// feedNow
// ───────────────────────────────────────────────────────────────

pub struct FeedNow;

impl RpcHandler for FeedNow {
    fn handle(&self, request: &RpcRequest, ctx: &mut dyn RpcContext) -> RpcResult {
        let Some(dose) = dose(request) else {
            return RpcResult::error("Invalid dose amount.");
        };
        if ctx.is_busy() {
            return RpcResult::error(FEEDER_BUSY_MESSAGE);
        }
        match ctx.start_feeding(dose) {
            Ok(()) => RpcResult::success_with(FEEDING_STARTED_MESSAGE),
            Err(FeederError::Busy) => RpcResult::error(FEEDER_BUSY_MESSAGE),
            Err(FeederError::InvalidDose) => RpcResult::error("Invalid dose amount."),
            Err(FeederError::SpawnFailed) => {
                RpcResult::error("Internal Error: Failed to start feeding.")
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// setTimezone
// ───────────────────────────────────────────────────────────────

pub struct SetTimezone;

impl RpcHandler for SetTimezone {
    fn handle(&self, request: &RpcRequest, ctx: &mut dyn RpcContext) -> RpcResult {
        let Some(timezone) = request.text("timezone").filter(|tz| is_valid_timezone(tz)) else {
            return RpcResult::error("Timezone parameter missing or invalid.");
        };
        match ctx.set_timezone(timezone) {
            Ok(()) => RpcResult::success_with("Timezone updated."),
            Err(e) => store_failure("Timezone", e),
        }
    }
}
