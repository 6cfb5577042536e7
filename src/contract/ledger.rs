use tracing::debug;

use crate::domain::{
    credit_balance, debit_balance, format_amount, parse_amount, Amount, BalanceError, TokenBalance,
};

use super::{respond, ConfigError, Contract, ContractError, Response, StateStore, TxContext};

pub const QUERY_TOKEN: &str = "queryToken";
pub const ISSUE_TOKEN: &str = "issueToken";
pub const SPEND_TOKEN: &str = "spendToken";

/// What an issue with a negative amount is allowed to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NegativeIssuance {
    /// Accept it as a debit, as long as the balance stays non-negative
    #[default]
    Allow,
    /// Refuse it as an argument error
    Reject,
}

impl NegativeIssuance {
    pub fn as_str(&self) -> &'static str {
        match self {
            NegativeIssuance::Allow => "allow",
            NegativeIssuance::Reject => "reject",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "allow" => Some(NegativeIssuance::Allow),
            "reject" => Some(NegativeIssuance::Reject),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        Self::from_str(s).ok_or_else(|| ConfigError::UnknownIssuancePolicy(s.to_string()))
    }
}

impl std::fmt::Display for NegativeIssuance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerConfig {
    pub negative_issuance: NegativeIssuance,
}

/// A ledger operation with its arguments already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    Query { account: String },
    Issue { account: String, amount: Amount },
    Spend { account: String, amount: Amount },
}

impl LedgerOp {
    /// Resolve a function name and its raw arguments into an operation.
    pub fn parse(function: &str, args: &[String]) -> Result<Self, ContractError> {
        match function {
            QUERY_TOKEN => {
                let [account] = args else {
                    return Err(ContractError::Argument("Expecting a key".into()));
                };
                Ok(LedgerOp::Query {
                    account: account_arg(account)?,
                })
            }
            ISSUE_TOKEN | SPEND_TOKEN => {
                let [account, amount] = args else {
                    return Err(ContractError::Argument(
                        "Expecting a key and a value".into(),
                    ));
                };
                let account = account_arg(account)?;
                let amount = amount_arg(amount)?;
                if function == ISSUE_TOKEN {
                    Ok(LedgerOp::Issue { account, amount })
                } else {
                    Ok(LedgerOp::Spend { account, amount })
                }
            }
            other => Err(ContractError::UnknownFunction(other.to_string())),
        }
    }

    pub fn function(&self) -> &'static str {
        match self {
            LedgerOp::Query { .. } => QUERY_TOKEN,
            LedgerOp::Issue { .. } => ISSUE_TOKEN,
            LedgerOp::Spend { .. } => SPEND_TOKEN,
        }
    }

    pub fn account(&self) -> &str {
        match self {
            LedgerOp::Query { account }
            | LedgerOp::Issue { account, .. }
            | LedgerOp::Spend { account, .. } => account,
        }
    }

    /// Positional arguments in wire form, amounts in canonical text.
    pub fn args(&self) -> Vec<String> {
        match self {
            LedgerOp::Query { account } => vec![account.clone()],
            LedgerOp::Issue { account, amount } | LedgerOp::Spend { account, amount } => {
                vec![account.clone(), format_amount(*amount)]
            }
        }
    }
}

fn account_arg(raw: &str) -> Result<String, ContractError> {
    if raw.is_empty() {
        return Err(ContractError::Argument(
            "Account identifier must not be empty".into(),
        ));
    }
    Ok(raw.to_string())
}

pub(crate) fn amount_arg(raw: &str) -> Result<Amount, ContractError> {
    parse_amount(raw)
        .map_err(|e| ContractError::Argument(format!("Failed to parse token: {} ({})", raw, e)))
}

/// Token balances, one record per account, holding the canonical 6-decimal text.
#[derive(Debug, Clone, Default)]
pub struct BalanceLedger {
    config: LedgerConfig,
}

impl BalanceLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Run one operation against `store`. Every check happens before the single write.
    pub fn execute<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        op: &LedgerOp,
    ) -> Result<TokenBalance, ContractError> {
        match op {
            LedgerOp::Query { account } => self.query(store, account),
            LedgerOp::Issue { account, amount } => self.issue(store, account, *amount),
            LedgerOp::Spend { account, amount } => self.spend(store, account, *amount),
        }
    }

    fn query<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        account: &str,
    ) -> Result<TokenBalance, ContractError> {
        let balance = read_balance(store, account)?
            .ok_or_else(|| ContractError::NotFound(account.to_string()))?;
        debug!(account, %balance, "queried balance");
        Ok(TokenBalance::new(account, balance))
    }

    fn issue<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        account: &str,
        amount: Amount,
    ) -> Result<TokenBalance, ContractError> {
        if amount.is_negative() && self.config.negative_issuance == NegativeIssuance::Reject {
            return Err(ContractError::Argument(format!(
                "Cannot issue a negative amount: {}",
                amount
            )));
        }

        let current = read_balance(store, account)?;
        let balance =
            credit_balance(current, amount).map_err(|e| balance_error(account, e))?;

        write_balance(store, account, balance)?;
        debug!(account, %amount, %balance, created = current.is_none(), "issued tokens");
        Ok(TokenBalance::new(account, balance))
    }

    fn spend<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        account: &str,
        amount: Amount,
    ) -> Result<TokenBalance, ContractError> {
        let current = read_balance(store, account)?
            .ok_or_else(|| ContractError::NotFound(account.to_string()))?;
        let balance = debit_balance(current, amount).map_err(|e| balance_error(account, e))?;

        write_balance(store, account, balance)?;
        debug!(account, %amount, %balance, "spent tokens");
        Ok(TokenBalance::new(account, balance))
    }
}

impl Contract for BalanceLedger {
    fn invoke(&self, ctx: &mut dyn TxContext, function: &str, args: &[String]) -> Response {
        let result = match LedgerOp::parse(function, args) {
            Ok(op) => self.execute(&mut *ctx, &op),
            Err(e) => Err(e),
        };
        respond(result)
    }
}

fn read_balance<S: StateStore + ?Sized>(
    store: &mut S,
    account: &str,
) -> Result<Option<Amount>, ContractError> {
    let Some(bytes) = store.get_state(account)? else {
        return Ok(None);
    };

    let corrupted = |bytes: &[u8]| ContractError::StateCorruption {
        key: account.to_string(),
        value: String::from_utf8_lossy(bytes).into_owned(),
    };
    let text = std::str::from_utf8(&bytes).map_err(|_| corrupted(&bytes))?;
    parse_amount(text).map(Some).map_err(|_| corrupted(&bytes))
}

fn write_balance<S: StateStore + ?Sized>(
    store: &mut S,
    account: &str,
    balance: Amount,
) -> Result<(), ContractError> {
    store.put_state(account, format_amount(balance).into_bytes())?;
    Ok(())
}

fn balance_error(account: &str, error: BalanceError) -> ContractError {
    match error {
        BalanceError::Insufficient { balance, requested } => ContractError::InsufficientFunds {
            account: account.to_string(),
            balance,
            requested,
        },
        BalanceError::NegativeDebit(_) | BalanceError::Overflow => {
            ContractError::Argument(error.to_string())
        }
    }
}
