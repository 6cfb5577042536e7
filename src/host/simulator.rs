use tracing::{debug, warn};

use crate::contract::{Response, StateStore, StoreError, TxContext};

use super::{ContractRegistry, RwSet, StateKey, WorldState};

/// Deepest chain of nested contract calls a transaction may build.
pub const MAX_CALL_DEPTH: usize = 8;

/// Executes one transaction against a committed snapshot, collecting its read/write set.
///
/// Reads see the transaction's own pending writes. Nothing reaches the
/// snapshot: the caller commits the resulting [`RwSet`] or drops it.
pub struct TxSimulator<'a> {
    registry: &'a ContractRegistry,
    state: &'a WorldState,
    channel: &'a str,
    namespace: String,
    depth: usize,
    rw_set: RwSet,
}

impl<'a> TxSimulator<'a> {
    pub fn new(registry: &'a ContractRegistry, state: &'a WorldState, channel: &'a str) -> Self {
        Self {
            registry,
            state,
            channel,
            namespace: String::new(),
            depth: 0,
            rw_set: RwSet::new(),
        }
    }

    pub fn rw_set(&self) -> &RwSet {
        &self.rw_set
    }

    pub fn into_rw_set(self) -> RwSet {
        self.rw_set
    }

    fn state_key(&self, key: &str) -> Result<StateKey, StoreError> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        Ok(StateKey::new(self.namespace.as_str(), key))
    }
}

impl StateStore for TxSimulator<'_> {
    fn get_state(&mut self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let key = self.state_key(key)?;
        if let Some(pending) = self.rw_set.pending_write(&key) {
            return Ok(Some(pending.clone()));
        }

        let committed = self.state.get(&key);
        let value = committed.map(|v| v.value.clone());
        self.rw_set.record_read(key, committed.map(|v| v.version));
        Ok(value)
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let key = self.state_key(key)?;
        self.rw_set.record_write(key, value);
        Ok(())
    }
}

impl TxContext for TxSimulator<'_> {
    fn channel(&self) -> &str {
        self.channel
    }

    fn invoke_contract(
        &mut self,
        contract: &str,
        function: &str,
        args: &[String],
        channel: &str,
    ) -> Response {
        if channel != self.channel {
            return Response::error(format!("Channel {} not found", channel));
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Response::error(format!(
                "Call depth limit of {} exceeded invoking {}",
                MAX_CALL_DEPTH, contract
            ));
        }

        let registry = self.registry;
        let Some(target) = registry.get(contract) else {
            return Response::error(format!("Contract {} not found", contract));
        };

        debug!(contract, function, depth = self.depth, "invoking contract");

        // A failed call must leave no writes behind
        let savepoint = self.rw_set.snapshot_writes();
        let caller = std::mem::replace(&mut self.namespace, contract.to_string());
        self.depth += 1;

        let response = target.invoke(self, function, args);

        self.depth -= 1;
        self.namespace = caller;

        if !response.is_ok() {
            warn!(
                contract,
                function,
                status = response.status,
                message = %response.message,
                "contract call failed, discarding its writes"
            );
            self.rw_set.restore_writes(savepoint);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Contract;

    /// Writes a marker, then fails or calls itself depending on the function.
    struct Probe;

    impl Contract for Probe {
        fn invoke(&self, ctx: &mut dyn TxContext, function: &str, args: &[String]) -> Response {
            match function {
                "write" => {
                    if let Err(e) = ctx.put_state(&args[0], args[1].as_bytes().to_vec()) {
                        return Response::error(e.to_string());
                    }
                    Response::success(Vec::new())
                }
                "writeThenFail" => {
                    let _ = ctx.put_state("marker", b"x".to_vec());
                    Response::error("failing on purpose")
                }
                "read" => match ctx.get_state(&args[0]) {
                    Ok(value) => Response::success(value.unwrap_or_default()),
                    Err(e) => Response::error(e.to_string()),
                },
                "callFailing" => {
                    let _ = ctx.put_state("outer", b"kept".to_vec());
                    let channel = ctx.channel().to_string();
                    let inner = ctx.invoke_contract("probe", "writeThenFail", &[], &channel);
                    Response::success(inner.status.to_string().into_bytes())
                }
                "recurse" => {
                    let channel = ctx.channel().to_string();
                    ctx.invoke_contract("probe", "recurse", &[], &channel)
                }
                _ => Response::error("unknown"),
            }
        }
    }

    fn registry() -> ContractRegistry {
        let mut registry = ContractRegistry::new();
        registry.register("probe", Probe);
        registry
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_reads_see_pending_writes() {
        let registry = registry();
        let state = WorldState::new();
        let mut sim = TxSimulator::new(&registry, &state, "ch");

        sim.invoke_contract("probe", "write", &args(&["k", "v1"]), "ch");
        let response = sim.invoke_contract("probe", "read", &args(&["k"]), "ch");

        assert_eq!(response.payload, b"v1".to_vec());
        // Served from the write set, so nothing was recorded as read
        assert!(sim.rw_set().reads().is_empty());
    }

    #[test]
    fn test_keys_are_namespaced_by_contract() {
        let registry = registry();
        let state = WorldState::new();
        let mut sim = TxSimulator::new(&registry, &state, "ch");

        sim.invoke_contract("probe", "write", &args(&["k", "v"]), "ch");
        let rw = sim.into_rw_set();
        assert!(rw.writes().contains_key(&StateKey::new("probe", "k")));
    }

    #[test]
    fn test_failed_nested_call_discards_its_writes() {
        let registry = registry();
        let state = WorldState::new();
        let mut sim = TxSimulator::new(&registry, &state, "ch");

        let response = sim.invoke_contract("probe", "callFailing", &[], "ch");
        assert!(response.is_ok());
        assert_eq!(response.payload_text(), "500");

        let rw = sim.into_rw_set();
        assert!(rw.writes().contains_key(&StateKey::new("probe", "outer")));
        assert!(!rw.writes().contains_key(&StateKey::new("probe", "marker")));
    }

    #[test]
    fn test_unknown_contract_and_channel() {
        let registry = registry();
        let state = WorldState::new();
        let mut sim = TxSimulator::new(&registry, &state, "ch");

        let missing = sim.invoke_contract("nope", "read", &args(&["k"]), "ch");
        assert!(!missing.is_ok());
        assert!(missing.message.contains("nope"));

        let foreign = sim.invoke_contract("probe", "read", &args(&["k"]), "elsewhere");
        assert!(!foreign.is_ok());
        assert!(foreign.message.contains("elsewhere"));
    }

    #[test]
    fn test_runaway_recursion_fails() {
        let registry = registry();
        let state = WorldState::new();
        let mut sim = TxSimulator::new(&registry, &state, "ch");

        let response = sim.invoke_contract("probe", "recurse", &[], "ch");
        assert!(!response.is_ok());
        assert!(response.message.contains("depth"));
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let registry = registry();
        let state = WorldState::new();
        let mut sim = TxSimulator::new(&registry, &state, "ch");

        let response = sim.invoke_contract("probe", "write", &args(&["", "v"]), "ch");
        assert!(!response.is_ok());
        assert!(sim.rw_set().is_read_only());
    }
}
