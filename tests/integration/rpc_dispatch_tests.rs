//! End-to-end RPC tests: dispatcher → built-in handlers → GuardianProxy
//! → ConfigStore → simulated EEPROM.
//!
//! Every request is checked twice: the JSON response, and what actually
//! landed in the byte store.

use std::time::Duration;

use aquaguard::adapters::eeprom::MemoryEeprom;
use aquaguard::adapters::feeder::{FeedTiming, FeederWorker, ServoPort};
use aquaguard::adapters::guardian::GuardianProxy;
use aquaguard::adapters::hardware::SharedReadings;
use aquaguard::app::ports::{FeederPort, ScheduleStore, TemperatureLimitStore, TimezoneStore};
use aquaguard::rpc::{DispatchOutcome, DropReason, RpcDispatcher};
use aquaguard::rpc::handlers::builtin_dispatcher;
use aquaguard::store::{ConfigStore, LoadOutcome};

struct NullServo;

impl ServoPort for NullServo {
    fn set_angle(&mut self, _degrees: u16) {}
}

type Device = GuardianProxy<MemoryEeprom, FeederWorker<NullServo>>;

fn device_with(timing: FeedTiming) -> Device {
    let mut store = ConfigStore::new(MemoryEeprom::new());
    assert!(matches!(store.init(), LoadOutcome::Defaulted { persisted: true, .. }));
    GuardianProxy::new(store, FeederWorker::new(NullServo, timing), SharedReadings::new())
}

fn device() -> Device {
    device_with(FeedTiming {
        hold_ms: 0,
        settle_ms: 0,
        ..FeedTiming::default()
    })
}

fn dispatcher() -> RpcDispatcher {
    builtin_dispatcher().expect("built-in methods are unique")
}

/// Dispatch `payload` as request 1 and return the response body.
fn call(d: &RpcDispatcher, dev: &mut Device, payload: &str) -> String {
    match d.dispatch("v1/devices/me/rpc/request/1", payload.as_bytes(), dev) {
        DispatchOutcome::Respond { response, .. } => {
            assert_eq!(response.topic.as_str(), "v1/devices/me/rpc/response/1");
            String::from_utf8(response.body).unwrap()
        }
        DispatchOutcome::Dropped(reason) => panic!("request dropped: {reason:?}"),
    }
}

/// Reload the EEPROM image into a fresh store.
fn reloaded(dev: &Device) -> ConfigStore<MemoryEeprom> {
    let mut store = ConfigStore::new(dev.config().byte_store().clone());
    assert_eq!(store.init(), LoadOutcome::Loaded);
    store
}

fn wait_idle(dev: &Device) {
    for _ in 0..500 {
        if !dev.is_busy() {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("feeder never finished");
}

// ── setTempLimits ─────────────────────────────────────────────

#[test]
fn temperature_limits_survive_reload() {
    let d = dispatcher();
    let mut dev = device();
    let body = call(
        &d,
        &mut dev,
        r#"{"method":"setTempLimits","params":{"min":22.5,"max":27.0,"min_enabled":true,"max_enabled":true}}"#,
    );
    assert!(body.contains(r#""result":"success""#), "{body}");

    let limits = TemperatureLimitStore::temperature_limits(&reloaded(&dev));
    assert_eq!(limits.min_c, 22.5);
    assert_eq!(limits.max_c, 27.0);
    assert!(limits.min_enabled && limits.max_enabled);
}

#[test]
fn invalid_limits_leave_eeprom_untouched() {
    let d = dispatcher();
    let mut dev = device();
    let writes = dev.config().byte_store().write_count();
    let body = call(
        &d,
        &mut dev,
        r#"{"method":"setTempLimits","params":{"min":30,"max":20,"min_enabled":true,"max_enabled":true}}"#,
    );
    assert!(body.contains(r#""result":"error""#), "{body}");
    assert_eq!(dev.config().byte_store().write_count(), writes);
}

// ── Feeding schedule ──────────────────────────────────────────

#[test]
fn schedule_add_overwrite_delete() {
    let d = dispatcher();
    let mut dev = device();

    let add = |dev: &mut Device, minute: u16| {
        call(
            &d,
            dev,
            &format!(
                r#"{{"method":"addFeedingSchedule","params":{{"slot_id":4,"minute":{minute},"dose":2,"enabled":true}}}}"#
            ),
        )
    };
    assert_eq!(
        add(&mut dev, 480),
        r#"{"result":"success","message":"Feeding schedule added successfully."}"#
    );
    add(&mut dev, 1200);

    let schedule = ScheduleStore::schedule(&reloaded(&dev));
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].minute_of_day, 1200);

    let body = call(&d, &mut dev, r#"{"method":"deleteFeedingSchedule","params":{"slot_id":4}}"#);
    assert_eq!(
        body,
        r#"{"result":"success","message":"Feeding schedule deleted successfully."}"#
    );
    assert!(ScheduleStore::schedule(&reloaded(&dev)).is_empty());
}

#[test]
fn schedule_out_of_range_is_rejected() {
    let d = dispatcher();
    let mut dev = device();
    let body = call(
        &d,
        &mut dev,
        r#"{"method":"addFeedingSchedule","params":{"slot_id":0,"minute":1440,"dose":1,"enabled":true}}"#,
    );
    assert_eq!(body, r#"{"result":"error","message":"Invalid minute (0-1439)."}"#);
    assert!(dev.schedule().is_empty());
}

// ── setTimezone ───────────────────────────────────────────────

#[test]
fn timezone_is_persisted() {
    let d = dispatcher();
    let mut dev = device();
    let body = call(&d, &mut dev, r#"{"method":"setTimezone","params":{"timezone":"EST5EDT"}}"#);
    assert!(body.contains("success"), "{body}");
    assert_eq!(TimezoneStore::timezone(&reloaded(&dev)).as_str(), "EST5EDT");
}

#[test]
fn missing_timezone_is_rejected() {
    let d = dispatcher();
    let mut dev = device();
    let body = call(&d, &mut dev, r#"{"method":"setTimezone","params":{}}"#);
    assert_eq!(
        body,
        r#"{"result":"error","message":"Timezone parameter missing or invalid."}"#
    );
    assert_eq!(dev.timezone().as_str(), "UTC0");
}

// ── feedNow ───────────────────────────────────────────────────

#[test]
fn feed_now_starts_worker_and_refuses_while_busy() {
    let d = dispatcher();
    let mut dev = device_with(FeedTiming {
        hold_ms: 200,
        settle_ms: 0,
        ..FeedTiming::default()
    });

    let first = call(&d, &mut dev, r#"{"method":"feedNow","params":{"dose":1}}"#);
    assert_eq!(first, r#"{"result":"success","message":"Feeding process started."}"#);
    assert!(dev.is_busy());

    let second = call(&d, &mut dev, r#"{"method":"feedNow","params":{"dose":1}}"#);
    assert_eq!(
        second,
        r#"{"result":"error","message":"Feeding in progress, device busy."}"#
    );

    wait_idle(&dev);
    let third = call(&d, &mut dev, r#"{"method":"feedNow","params":{"dose":5}}"#);
    assert!(third.contains("success"), "{third}");
    wait_idle(&dev);
}

#[test]
fn feed_now_rejects_bad_dose() {
    let d = dispatcher();
    let mut dev = device();
    for payload in [
        r#"{"method":"feedNow","params":{"dose":0}}"#,
        r#"{"method":"feedNow","params":{"dose":9}}"#,
        r#"{"method":"feedNow"}"#,
    ] {
        assert_eq!(
            call(&d, &mut dev, payload),
            r#"{"result":"error","message":"Invalid dose amount."}"#
        );
    }
    assert!(!dev.is_busy());
}

// ── Persistence failure ───────────────────────────────────────

#[test]
fn write_failure_is_reported_but_value_is_live() {
    let d = dispatcher();
    let mut dev = device();
    dev.config_mut().byte_store_mut().fail_writes(true);

    let body = call(&d, &mut dev, r#"{"method":"setTimezone","params":{"timezone":"JST-9"}}"#);
    assert!(body.contains(r#""result":"error""#), "{body}");
    assert!(body.contains("not persisted"), "{body}");
    assert_eq!(dev.timezone().as_str(), "JST-9");

    dev.config_mut().byte_store_mut().fail_writes(false);
    assert_eq!(TimezoneStore::timezone(&reloaded(&dev)).as_str(), "UTC0");
}

// ── Drops ─────────────────────────────────────────────────────

#[test]
fn uncorrelatable_requests_are_dropped_without_side_effects() {
    let d = dispatcher();
    let mut dev = device();
    let writes = dev.config().byte_store().write_count();

    let cases: [(&str, &[u8], DropReason); 4] = [
        ("v1/devices/me/rpc/request/abc", b"{oops", DropReason::InvalidJson),
        ("v1/devices/me/rpc/request/2", br#"{"params":{}}"#, DropReason::MissingMethod),
        ("v1/devices/me/rpc/request/2", br#"{"method":"selfDestruct"}"#, DropReason::UnknownMethod),
        (
            "v1/devices/me/rpc/request/",
            br#"{"method":"setTimezone","params":{"timezone":"JST-9"}}"#,
            DropReason::NoRequestId,
        ),
    ];
    for (topic, payload, reason) in cases {
        assert_eq!(d.dispatch(topic, payload, &mut dev), DispatchOutcome::Dropped(reason), "{topic}");
    }
    assert_eq!(dev.timezone().as_str(), "UTC0");
    assert_eq!(dev.config().byte_store().write_count(), writes);
}
