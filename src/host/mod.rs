//! In-process host for contracts: a registry, transaction simulation and
//! optimistic (MVCC) validation of versioned state.

mod simulator;
mod world_state;

pub use simulator::*;
pub use world_state::*;

use std::collections::BTreeMap;

use crate::contract::{
    BalanceLedger, ConfigError, Contract, LedgerConfig, Response, TxContext, VoucherConfig,
    VoucherExchange, DEFAULT_VOUCHER_CONTRACT,
};

/// Deployed contracts by name.
#[derive(Default)]
pub struct ContractRegistry {
    contracts: BTreeMap<String, Box<dyn Contract>>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, contract: impl Contract + 'static) {
        self.contracts.insert(name.into(), Box::new(contract));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Contract> {
        self.contracts.get(name).map(|c| c.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }
}

/// Result of simulating one transaction. Writes are only meaningful when the response is ok.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub response: Response,
    pub rw_set: RwSet,
}

impl Simulation {
    pub fn is_ok(&self) -> bool {
        self.response.is_ok()
    }
}

/// Contracts deployed on one channel.
pub struct Runtime {
    registry: ContractRegistry,
    channel: String,
}

impl Runtime {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            registry: ContractRegistry::new(),
            channel: channel.into(),
        }
    }

    /// Deploy the balance ledger and the voucher exchange wired to it.
    pub fn with_contracts(
        ledger: LedgerConfig,
        voucher: VoucherConfig,
    ) -> Result<Self, ConfigError> {
        let mut runtime = Self::new(voucher.channel.clone());
        let ledger_name = voucher.ledger_contract.clone();
        runtime.deploy(ledger_name, BalanceLedger::new(ledger));
        runtime.deploy(DEFAULT_VOUCHER_CONTRACT, VoucherExchange::new(voucher)?);
        Ok(runtime)
    }

    pub fn deploy(&mut self, name: impl Into<String>, contract: impl Contract + 'static) {
        self.registry.register(name, contract);
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    /// Run `contract.function(args)` against `state` without changing it.
    pub fn simulate(
        &self,
        state: &WorldState,
        contract: &str,
        function: &str,
        args: &[String],
    ) -> Simulation {
        let mut simulator = TxSimulator::new(&self.registry, state, &self.channel);
        let response = simulator.invoke_contract(contract, function, args, &self.channel);
        Simulation {
            response,
            rw_set: simulator.into_rw_set(),
        }
    }
}
