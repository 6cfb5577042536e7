use tracing::debug;

use crate::domain::{Amount, TokenBalance, VoucherGrant, VoucherSchedule};

use super::{
    amount_arg, respond, ConfigError, Contract, ContractError, LedgerOp, Response, TxContext,
};

pub const GET_VOUCHER: &str = "getVoucher";

/// Registry names the two contracts are deployed under by default.
pub const DEFAULT_LEDGER_CONTRACT: &str = "balance_ledger";
pub const DEFAULT_VOUCHER_CONTRACT: &str = "voucher_exchange";
pub const DEFAULT_CHANNEL: &str = "mychannel";
pub const DEFAULT_COMPANY_ID: &str = "Company 1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoucherConfig {
    pub schedule: VoucherSchedule,
    /// Issuer identity stamped on every grant
    pub company_id: String,
    /// Contract that holds the token balances
    pub ledger_contract: String,
    /// Channel the ledger contract is reached on
    pub channel: String,
}

impl Default for VoucherConfig {
    fn default() -> Self {
        Self {
            schedule: VoucherSchedule::default(),
            company_id: DEFAULT_COMPANY_ID.to_string(),
            ledger_contract: DEFAULT_LEDGER_CONTRACT.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
        }
    }
}

impl VoucherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.schedule.token_to_voucher_rate;
        if rate <= Amount::ZERO {
            return Err(ConfigError::NonPositiveRate(rate));
        }
        if self.schedule.max_voucher.is_negative() {
            return Err(ConfigError::NegativeCap(self.schedule.max_voucher));
        }
        if self.company_id.is_empty() {
            return Err(ConfigError::EmptyName("Company ID"));
        }
        if self.ledger_contract.is_empty() {
            return Err(ConfigError::EmptyName("Ledger contract name"));
        }
        if self.channel.is_empty() {
            return Err(ConfigError::EmptyName("Channel"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoucherOp {
    GetVoucher { account: String, tokens: Amount },
}

impl VoucherOp {
    pub fn parse(function: &str, args: &[String]) -> Result<Self, ContractError> {
        match function {
            GET_VOUCHER => {
                let [account, tokens] = args else {
                    return Err(ContractError::Argument(
                        "Expecting an account and a token amount".into(),
                    ));
                };
                if account.is_empty() {
                    return Err(ContractError::Argument(
                        "Account identifier must not be empty".into(),
                    ));
                }
                let tokens = amount_arg(tokens)?;
                if tokens.is_negative() {
                    return Err(ContractError::Argument(format!(
                        "Cannot exchange a negative token amount: {}",
                        tokens
                    )));
                }
                Ok(VoucherOp::GetVoucher {
                    account: account.clone(),
                    tokens,
                })
            }
            other => Err(ContractError::UnknownFunction(other.to_string())),
        }
    }
}

/// Exchanges tokens for a capped voucher, paying with a nested spend on the ledger.
/// Holds no state of its own.
#[derive(Debug, Clone, Default)]
pub struct VoucherExchange {
    config: VoucherConfig,
}

impl VoucherExchange {
    pub fn new(config: VoucherConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &VoucherConfig {
        &self.config
    }

    pub fn execute(
        &self,
        ctx: &mut dyn TxContext,
        op: &VoucherOp,
    ) -> Result<VoucherGrant, ContractError> {
        match op {
            VoucherOp::GetVoucher { account, tokens } => self.get_voucher(ctx, account, *tokens),
        }
    }

    fn get_voucher(
        &self,
        ctx: &mut dyn TxContext,
        account: &str,
        tokens: Amount,
    ) -> Result<VoucherGrant, ContractError> {
        let current = self.call_ledger(
            ctx,
            &LedgerOp::Query {
                account: account.to_string(),
            },
        )?;

        if current.balance < tokens {
            return Err(ContractError::InsufficientFunds {
                account: account.to_string(),
                balance: current.balance,
                requested: tokens,
            });
        }

        let quote = self.config.schedule.quote(tokens).ok_or_else(|| {
            ContractError::Argument(format!("Token amount out of range: {}", tokens))
        })?;

        let remaining = self.call_ledger(
            ctx,
            &LedgerOp::Spend {
                account: account.to_string(),
                amount: quote.spend,
            },
        )?;

        debug!(
            account,
            spend = %quote.spend,
            voucher = %quote.voucher,
            capped = quote.capped,
            remaining = %remaining.balance,
            "granted voucher"
        );

        Ok(VoucherGrant {
            account_id: account.to_string(),
            company_id: self.config.company_id.clone(),
            spend_token: quote.spend,
            voucher: quote.voucher,
        })
    }

    fn call_ledger(
        &self,
        ctx: &mut dyn TxContext,
        op: &LedgerOp,
    ) -> Result<TokenBalance, ContractError> {
        let response = ctx.invoke_contract(
            &self.config.ledger_contract,
            op.function(),
            &op.args(),
            &self.config.channel,
        );
        ledger_result(&self.config.ledger_contract, op, response)
    }
}

impl Contract for VoucherExchange {
    fn invoke(&self, ctx: &mut dyn TxContext, function: &str, args: &[String]) -> Response {
        let result = match VoucherOp::parse(function, args) {
            Ok(op) => self.execute(ctx, &op),
            Err(e) => Err(e),
        };
        respond(result)
    }
}

/// Fold a nested ledger response into a typed result.
///
/// A failure status, an unreadable payload, or a payload about a different
/// account are all dependency errors. There is no fallback value.
pub fn ledger_result(
    contract: &str,
    op: &LedgerOp,
    response: Response,
) -> Result<TokenBalance, ContractError> {
    let dependency = |reason: String| ContractError::Dependency {
        contract: contract.to_string(),
        function: op.function().to_string(),
        reason,
    };

    if !response.is_ok() {
        return Err(dependency(format!(
            "status {}: {}",
            response.status, response.message
        )));
    }

    let balance: TokenBalance = serde_json::from_slice(&response.payload)
        .map_err(|e| dependency(format!("unreadable payload: {}", e)))?;

    if balance.account_id != op.account() {
        return Err(dependency(format!(
            "payload is for account {} instead of {}",
            balance.account_id,
            op.account()
        )));
    }

    Ok(balance)
}
