use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::contract::{
    LedgerConfig, LedgerOp, Response, VoucherConfig, DEFAULT_VOUCHER_CONTRACT, GET_VOUCHER,
};
use crate::domain::{parse_amount, Amount, TokenBalance, TxId, TxRecord, VoucherGrant};
use crate::host::Runtime;
use crate::storage::{CommitOutcome, Repository};

use super::AppError;

/// Contract configuration the service deploys with.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub ledger: LedgerConfig,
    pub voucher: VoucherConfig,
}

/// A committed transaction together with its decoded result.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub record: TxRecord,
    pub result: T,
}

/// Application service: simulates invocations against the committed state
/// and persists the ones that succeed.
/// This is the primary interface for any client (CLI, tests, tools).
pub struct LedgerService {
    repo: Repository,
    runtime: Runtime,
    config: ServiceConfig,
}

impl LedgerService {
    /// Create a new service with the given repository and contract configuration.
    pub fn new(repo: Repository, config: ServiceConfig) -> Result<Self, AppError> {
        let runtime = Runtime::with_contracts(config.ledger.clone(), config.voucher.clone())?;
        Ok(Self {
            repo,
            runtime,
            config,
        })
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str, config: ServiceConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Self::new(repo, config)
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, config: ServiceConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Self::new(repo, config)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Registry name of the balance ledger.
    pub fn ledger_contract(&self) -> &str {
        &self.config.voucher.ledger_contract
    }

    // ========================
    // Raw invocations
    // ========================

    /// Simulate and commit a transaction. Fails without writing anything when
    /// the contract rejects it or a concurrent commit invalidated its reads.
    pub async fn submit(
        &self,
        contract: &str,
        function: &str,
        args: Vec<String>,
    ) -> Result<TxRecord, AppError> {
        let state = self.repo.load_world_state().await?;
        let simulation = self.runtime.simulate(&state, contract, function, &args);
        if !simulation.is_ok() {
            return Err(rejected(contract, function, simulation.response));
        }

        let mut record = TxRecord::new(
            contract,
            function,
            args,
            simulation.response.payload_text(),
        );

        match self.repo.commit(&mut record, &simulation.rw_set).await? {
            CommitOutcome::Committed { sequence } => {
                info!(
                    tx_id = %record.tx_id,
                    sequence,
                    contract,
                    function,
                    writes = simulation.rw_set.writes().len(),
                    "committed transaction"
                );
                Ok(record)
            }
            CommitOutcome::Conflict(conflict) => {
                warn!(contract, function, %conflict, "transaction invalidated");
                Err(AppError::MvccConflict(conflict))
            }
        }
    }

    /// Simulate a transaction and return its payload. Nothing is committed.
    pub async fn evaluate(
        &self,
        contract: &str,
        function: &str,
        args: &[String],
    ) -> Result<String, AppError> {
        let state = self.repo.load_world_state().await?;
        let simulation = self.runtime.simulate(&state, contract, function, args);
        if !simulation.is_ok() {
            return Err(rejected(contract, function, simulation.response));
        }
        debug!(contract, function, "evaluated transaction");
        Ok(simulation.response.payload_text())
    }

    // ========================
    // Ledger operations
    // ========================

    /// Current balance of an account.
    pub async fn query_balance(&self, account: &str) -> Result<TokenBalance, AppError> {
        let op = LedgerOp::Query {
            account: account.to_string(),
        };
        let payload = self
            .evaluate(self.ledger_contract(), op.function(), &op.args())
            .await?;
        Ok(serde_json::from_str(&payload)?)
    }

    /// Credit tokens to an account, creating it if needed.
    pub async fn issue(
        &self,
        account: &str,
        amount: Amount,
    ) -> Result<Committed<TokenBalance>, AppError> {
        let op = LedgerOp::Issue {
            account: account.to_string(),
            amount,
        };
        self.submit_ledger(op).await
    }

    /// Debit tokens from an existing account.
    pub async fn spend(
        &self,
        account: &str,
        amount: Amount,
    ) -> Result<Committed<TokenBalance>, AppError> {
        let op = LedgerOp::Spend {
            account: account.to_string(),
            amount,
        };
        self.submit_ledger(op).await
    }

    async fn submit_ledger(&self, op: LedgerOp) -> Result<Committed<TokenBalance>, AppError> {
        let record = self
            .submit(self.ledger_contract(), op.function(), op.args())
            .await?;
        decode(record)
    }

    /// Balances of every account, ordered by account identifier.
    pub async fn list_balances(&self) -> Result<Vec<TokenBalance>, AppError> {
        let state = self.repo.load_world_state().await?;

        state
            .namespace(self.ledger_contract())
            .map(|(account, entry)| {
                let text = String::from_utf8_lossy(&entry.value);
                parse_amount(&text)
                    .map(|balance| TokenBalance::new(account, balance))
                    .map_err(|_| AppError::CorruptBalance {
                        account: account.to_string(),
                        value: text.into_owned(),
                    })
            })
            .collect()
    }

    // ========================
    // Voucher operations
    // ========================

    /// Exchange tokens for a voucher.
    pub async fn get_voucher(
        &self,
        account: &str,
        tokens: Amount,
    ) -> Result<Committed<VoucherGrant>, AppError> {
        let args = vec![account.to_string(), tokens.to_string()];
        let record = self
            .submit(DEFAULT_VOUCHER_CONTRACT, GET_VOUCHER, args)
            .await?;
        decode(record)
    }

    // ========================
    // History
    // ========================

    /// Committed transactions, newest first.
    pub async fn history(&self, limit: Option<usize>) -> Result<Vec<TxRecord>, AppError> {
        Ok(self.repo.list_transactions(limit).await?)
    }

    /// Get a committed transaction by ID.
    pub async fn get_transaction(&self, id: TxId) -> Result<TxRecord, AppError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(id.to_string()))
    }
}

fn rejected(contract: &str, function: &str, response: Response) -> AppError {
    warn!(
        contract,
        function,
        status = response.status,
        message = %response.message,
        "transaction rejected"
    );
    AppError::Rejected {
        contract: contract.to_string(),
        function: function.to_string(),
        status: response.status,
        message: response.message,
    }
}

fn decode<T: DeserializeOwned>(record: TxRecord) -> Result<Committed<T>, AppError> {
    let result = serde_json::from_str(&record.payload)?;
    Ok(Committed { record, result })
}
