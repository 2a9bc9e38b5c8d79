//! Fuzz target: `RpcDispatcher::dispatch`
//!
//! Feeds arbitrary payloads through the built-in methods against an
//! in-memory device.  The dispatcher must never panic, every response
//! must go to the response topic of the request id, and the stored
//! configuration must stay decodable.
//!
//! cargo fuzz run fuzz_rpc_dispatch

#![no_main]

use aquaguard::adapters::eeprom::MemoryEeprom;
use aquaguard::adapters::guardian::GuardianProxy;
use aquaguard::adapters::hardware::SharedReadings;
use aquaguard::app::ports::FeederPort;
use aquaguard::error::FeederError;
use aquaguard::rpc::handlers::builtin_dispatcher;
use aquaguard::rpc::DispatchOutcome;
use aquaguard::store::ConfigStore;
use libfuzzer_sys::fuzz_target;

struct InstantFeeder;

impl FeederPort for InstantFeeder {
    fn is_busy(&self) -> bool {
        false
    }

    fn start_feeding(&mut self, dose: u8) -> Result<(), FeederError> {
        if (1..=5).contains(&dose) {
            Ok(())
        } else {
            Err(FeederError::InvalidDose)
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(dispatcher) = builtin_dispatcher() else {
        return;
    };
    let mut store = ConfigStore::new(MemoryEeprom::new());
    store.init();
    let mut device = GuardianProxy::new(store, InstantFeeder, SharedReadings::new());

    if let DispatchOutcome::Respond { response, .. } =
        dispatcher.dispatch("v1/devices/me/rpc/request/7", data, &mut device)
    {
        assert_eq!(response.topic.as_str(), "v1/devices/me/rpc/response/7");
        assert!(serde_json::from_slice::<serde_json::Value>(&response.body).is_ok());
    }

    // Whatever the request did, the EEPROM image must reload.
    let mut reloaded = ConfigStore::new(device.config().byte_store().clone());
    assert_eq!(reloaded.init(), aquaguard::store::LoadOutcome::Loaded);
});
