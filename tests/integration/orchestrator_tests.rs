//! Integration tests for the Orchestrator → FSM → link ports pipeline.
//!
//! Drives the real phase table and dispatcher against mock links and
//! checks the calls that reach them.

use aquaguard::adapters::mqtt::MqttLink;
use aquaguard::adapters::sntp::SntpClock;
use aquaguard::adapters::wifi::WifiLink;
use aquaguard::app::events::{AppEvent, LinkKind};
use aquaguard::app::orchestrator::Orchestrator;
use aquaguard::app::ports::ConnectivityStatus;
use aquaguard::config::NetworkConfig;
use aquaguard::error::LinkError;
use aquaguard::events::EventQueue;
use aquaguard::fsm::ConnectionPhase;
use aquaguard::fsm::states::CONNECT_RETRY_TICKS;
use aquaguard::rpc::handlers::builtin_dispatcher;
use aquaguard::topics::{ATTRIBUTES_TOPIC, RPC_REQUEST_TOPIC, TELEMETRY_TOPIC};

use crate::mock_links::{
    BRING_UP_TICKS, Harness, MockBroker, MockClock, MockDevice, MockRadio, RecordingSink,
    TELEMETRY_MS, TICK_MS,
};

// ── Bring-up ──────────────────────────────────────────────────

#[test]
fn bring_up_visits_every_phase_in_order() {
    let mut h = Harness::new();
    assert_eq!(h.phase(), ConnectionPhase::Init);
    assert!(matches!(h.sink.events[0], AppEvent::Started(ConnectionPhase::Init)));

    h.tick_n(BRING_UP_TICKS);

    use ConnectionPhase::*;
    let expected = [
        (Init, StartRadio),
        (StartRadio, AwaitRadio),
        (AwaitRadio, StartTimeSync),
        (StartTimeSync, AwaitTimeSync),
        (AwaitTimeSync, StartMessageLink),
        (StartMessageLink, AwaitMessageLink),
        (AwaitMessageLink, SubscribeTopics),
        (SubscribeTopics, Idle),
    ];
    assert_eq!(h.sink.phase_changes(), expected);
    assert!(h.orch.is_radio_connected());
    assert!(h.orch.is_broker_connected());
}

#[test]
fn each_link_is_started_once() {
    let h = Harness::online();
    assert_eq!(h.orch.radio().starts, 1);
    assert_eq!(h.orch.message_link().starts, 1);
    assert_eq!(h.orch.time_source().requests.len(), 1);
}

#[test]
fn time_sync_uses_the_stored_timezone() {
    let mut h = Harness::new();
    h.device.doc.timezone = "CET-1CEST,M3.5.0,M10.5.0/3".try_into().unwrap();
    h.tick_n(BRING_UP_TICKS);
    assert_eq!(h.orch.time_source().requests, ["CET-1CEST,M3.5.0,M10.5.0/3"]);
}

#[test]
fn await_radio_holds_without_association() {
    let radio = MockRadio {
        connect_on_start: false,
        ..MockRadio::default()
    };
    let mut h = Harness::with_links(radio, MockBroker::default(), MockClock::default());
    h.tick_n(20);
    assert_eq!(h.phase(), ConnectionPhase::AwaitRadio);
    assert_eq!(h.orch.radio().starts, 1);
    assert!(h.orch.time_source().requests.is_empty());

    h.orch.radio_mut().connected = true;
    h.tick();
    assert_eq!(h.phase(), ConnectionPhase::StartTimeSync);
}

#[test]
fn await_time_sync_holds_until_synced() {
    let clock = MockClock {
        sync_on_request: false,
        ..MockClock::default()
    };
    let mut h = Harness::with_links(MockRadio::default(), MockBroker::default(), clock);
    h.tick_n(20);
    assert_eq!(h.phase(), ConnectionPhase::AwaitTimeSync);
    assert_eq!(h.orch.message_link().starts, 0);

    h.orch.time_source_mut().synced = true;
    h.tick_n(4);
    assert_eq!(h.phase(), ConnectionPhase::Idle);
}

#[test]
fn subscribes_to_rpc_and_attribute_topics() {
    let h = Harness::online();
    assert!(h.broker().inbox_attached);
    assert_eq!(h.broker().subscriptions, [RPC_REQUEST_TOPIC, ATTRIBUTES_TOPIC]);
}

#[test]
fn start_does_not_touch_the_links() {
    let h = Harness::new();
    assert_eq!(h.orch.radio().starts, 0);
    assert_eq!(h.orch.tick_count(), 0);
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn first_telemetry_one_interval_after_subscribe() {
    let mut h = Harness::online();
    h.run_for(u64::from(TELEMETRY_MS) - 50);
    assert!(h.broker().published_on(TELEMETRY_TOPIC).is_empty());

    h.run_for(100);
    assert_eq!(
        h.broker().published_on(TELEMETRY_TOPIC),
        [r#"{"temperature":24.5,"tds":180}"#]
    );
    assert_eq!(h.phase(), ConnectionPhase::Idle);
}

#[test]
fn telemetry_repeats_every_interval() {
    let mut h = Harness::online();
    h.run_for(u64::from(TELEMETRY_MS) * 3 + 100);
    assert_eq!(h.broker().published_on(TELEMETRY_TOPIC).len(), 3);
    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::Telemetry(_))), 3);
}

#[test]
fn telemetry_failure_is_reported_and_idle_resumes() {
    let mut h = Harness::online();
    h.broker_mut().fail_publish = true;
    h.run_for(u64::from(TELEMETRY_MS) + 100);

    assert!(h
        .sink
        .events
        .contains(&AppEvent::TelemetryFailed(LinkError::PublishFailed)));
    assert_eq!(h.phase(), ConnectionPhase::Idle);
}

// ── Link loss ─────────────────────────────────────────────────

#[test]
fn radio_loss_in_idle_faults() {
    let mut h = Harness::online();
    h.orch.radio_mut().connected = false;
    h.tick();

    assert_eq!(h.phase(), ConnectionPhase::Fault);
    assert!(h.orch.is_faulted());
    assert!(h.sink.events.contains(&AppEvent::LinkLost(LinkKind::Radio)));
    assert_eq!(
        h.sink.phase_changes().last(),
        Some(&(ConnectionPhase::Idle, ConnectionPhase::Fault))
    );
}

#[test]
fn broker_loss_in_idle_faults() {
    let mut h = Harness::online();
    h.broker_mut().connected = false;
    h.tick();
    assert_eq!(h.phase(), ConnectionPhase::Fault);
    assert!(h.sink.events.contains(&AppEvent::LinkLost(LinkKind::Broker)));
}

#[test]
fn fault_is_terminal_without_reset() {
    let mut h = Harness::online();
    h.orch.radio_mut().connected = false;
    h.tick();
    h.orch.radio_mut().connected = true;
    h.run_for(u64::from(TELEMETRY_MS) * 5);

    assert_eq!(h.phase(), ConnectionPhase::Fault);
    assert_eq!(h.orch.radio().starts, 1);
    assert!(h.broker().published_on(TELEMETRY_TOPIC).is_empty());
    assert_eq!(h.sink.count(|e| matches!(e, AppEvent::LinkLost(_))), 1);
}

#[test]
fn reset_restarts_bring_up_from_fault_only() {
    let mut h = Harness::online();
    assert!(!h.orch.reset(&mut h.sink));
    assert_eq!(h.phase(), ConnectionPhase::Idle);

    h.broker_mut().connected = false;
    h.tick();
    assert!(h.orch.reset(&mut h.sink));
    assert_eq!(h.phase(), ConnectionPhase::Init);

    h.tick_n(BRING_UP_TICKS);
    assert_eq!(h.phase(), ConnectionPhase::Idle);
    assert_eq!(h.orch.message_link().starts, 2);
}

// ── Message routing ───────────────────────────────────────────

#[test]
fn rpc_request_is_answered_on_its_response_topic() {
    let mut h = Harness::online();
    h.deliver(
        "v1/devices/me/rpc/request/42",
        br#"{"method":"feedNow","params":{"dose":2}}"#,
    );
    h.tick();

    assert_eq!(h.device.feed_runs, [2]);
    assert_eq!(
        h.broker().published_on("v1/devices/me/rpc/response/42"),
        [r#"{"result":"success","message":"Feeding process started."}"#]
    );
    assert!(h.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::RpcCompleted { method, success: true } if method.as_str() == "feedNow"
    )));
}

#[test]
fn inbox_is_drained_completely_each_tick() {
    let mut h = Harness::online();
    for id in 1..=3 {
        h.deliver(
            &format!("v1/devices/me/rpc/request/{id}"),
            format!(r#"{{"method":"deleteFeedingSchedule","params":{{"slot_id":{id}}}}}"#).as_bytes(),
        );
    }
    h.tick();
    assert!(h.inbox.is_empty());
    let responses = h
        .broker()
        .published
        .iter()
        .filter(|(t, _)| t.starts_with("v1/devices/me/rpc/response/"))
        .count();
    assert_eq!(responses, 3);
}

#[test]
fn malformed_json_gets_an_error_response() {
    let mut h = Harness::online();
    h.deliver("v1/devices/me/rpc/request/7", b"{not json");
    h.tick();
    assert_eq!(
        h.broker().published_on("v1/devices/me/rpc/response/7"),
        [r#"{"result":"error","message":"Invalid JSON payload."}"#]
    );
}

#[test]
fn unknown_method_is_silently_dropped() {
    let mut h = Harness::online();
    h.deliver("v1/devices/me/rpc/request/8", br#"{"method":"reboot"}"#);
    h.tick();
    assert!(h.broker().published_on("v1/devices/me/rpc/response/8").is_empty());
    assert!(h.sink.events.contains(&AppEvent::MessageDropped));
}

#[test]
fn attribute_updates_do_not_publish() {
    let mut h = Harness::online();
    let before = h.broker().published.len();
    h.deliver(ATTRIBUTES_TOPIC, br#"{"firmware":"1.2.0"}"#);
    h.deliver(ATTRIBUTES_TOPIC, b"[1,2]");
    h.tick();
    assert_eq!(h.broker().published.len(), before);
    assert!(!h.sink.events.contains(&AppEvent::MessageDropped));
}

#[test]
fn unknown_topic_is_dropped() {
    let mut h = Harness::online();
    h.deliver("v1/devices/me/other", b"{}");
    h.tick();
    assert!(h.sink.events.contains(&AppEvent::MessageDropped));
}

#[test]
fn rpc_answer_while_broker_down_is_logged_not_fatal() {
    let mut h = Harness::new();
    // Still bringing links up: the broker is not connected yet.
    h.deliver("v1/devices/me/rpc/request/3", br#"{"method":"feedNow","params":{"dose":1}}"#);
    h.tick();
    assert_eq!(h.device.feed_runs, [1]);
    assert!(h.broker().published.is_empty());
    assert_eq!(h.phase(), ConnectionPhase::StartRadio);
}

// ── Recovery during bring-up (simulated adapters) ─────────────

type SimOrchestrator = Orchestrator<WifiLink, MqttLink, SntpClock>;

fn run_ticks(
    orch: &mut SimOrchestrator,
    now_ms: &mut u64,
    device: &mut MockDevice,
    sink: &mut RecordingSink,
    n: u64,
) {
    for _ in 0..n {
        *now_ms += TICK_MS;
        orch.update(*now_ms, device, sink);
    }
}

#[test]
fn refused_first_connects_are_retried_while_awaiting() {
    let (radio, sim_radio) = WifiLink::simulated("aquarium", "").unwrap();
    let (broker, sim_broker) = MqttLink::simulated(&NetworkConfig::default());
    let (clock, _sim_clock) = SntpClock::simulated("pool.ntp.org");
    sim_radio.reject_connects(true);
    sim_broker.reject_connects(true);

    let inbox: &'static EventQueue = Box::leak(Box::new(EventQueue::new()));
    let dispatcher = builtin_dispatcher().unwrap();
    let mut orch = Orchestrator::new(radio, broker, clock, dispatcher, inbox, TELEMETRY_MS);
    let mut device = MockDevice::default();
    let mut sink = RecordingSink::default();
    let mut now_ms = 0;
    orch.start(&mut sink);

    run_ticks(&mut orch, &mut now_ms, &mut device, &mut sink, 20);
    assert_eq!(orch.phase(), ConnectionPhase::AwaitRadio);
    assert_eq!(sim_radio.connect_count(), 1);

    // The access point comes back; the next retry associates.
    sim_radio.reject_connects(false);
    run_ticks(&mut orch, &mut now_ms, &mut device, &mut sink, CONNECT_RETRY_TICKS + 10);
    assert!(orch.is_radio_connected());
    assert_eq!(sim_radio.connect_count(), 2);
    assert_eq!(orch.phase(), ConnectionPhase::AwaitMessageLink);
    assert!(!orch.is_broker_connected());

    sim_broker.reject_connects(false);
    run_ticks(&mut orch, &mut now_ms, &mut device, &mut sink, CONNECT_RETRY_TICKS + 10);
    assert_eq!(orch.phase(), ConnectionPhase::Idle);
    assert!(orch.is_broker_connected());
    assert!(sim_broker.subscriptions().contains(&RPC_REQUEST_TOPIC.to_string()));
}

#[test]
fn broker_reconnecting_on_its_own_completes_bring_up() {
    let (radio, _sim_radio) = WifiLink::simulated("aquarium", "").unwrap();
    let (broker, sim_broker) = MqttLink::simulated(&NetworkConfig::default());
    let (clock, _sim_clock) = SntpClock::simulated("pool.ntp.org");
    sim_broker.reject_connects(true);

    let inbox: &'static EventQueue = Box::leak(Box::new(EventQueue::new()));
    let dispatcher = builtin_dispatcher().unwrap();
    let mut orch = Orchestrator::new(radio, broker, clock, dispatcher, inbox, TELEMETRY_MS);
    let mut device = MockDevice::default();
    let mut sink = RecordingSink::default();
    let mut now_ms = 0;
    orch.start(&mut sink);

    run_ticks(&mut orch, &mut now_ms, &mut device, &mut sink, 20);
    assert_eq!(orch.phase(), ConnectionPhase::AwaitMessageLink);

    sim_broker.restore_link();
    run_ticks(&mut orch, &mut now_ms, &mut device, &mut sink, 3);
    assert_eq!(orch.phase(), ConnectionPhase::Idle);
    assert_eq!(sim_broker.connect_count(), 1);
}
