use super::Amount;

/// Compute the balance after crediting `amount` to an account.
/// An account with no record starts from zero. The result must stay non-negative,
/// so a negative credit larger than the balance is refused.
pub fn credit_balance(current: Option<Amount>, amount: Amount) -> Result<Amount, BalanceError> {
    let balance = current.unwrap_or(Amount::ZERO);
    let next = balance.checked_add(amount).ok_or(BalanceError::Overflow)?;
    if next.is_negative() {
        return Err(BalanceError::Insufficient {
            balance,
            requested: amount,
        });
    }
    Ok(next)
}

/// Compute the balance after debiting `amount` from an existing balance.
pub fn debit_balance(current: Amount, amount: Amount) -> Result<Amount, BalanceError> {
    if amount.is_negative() {
        return Err(BalanceError::NegativeDebit(amount));
    }
    if amount > current {
        return Err(BalanceError::Insufficient {
            balance: current,
            requested: amount,
        });
    }
    current.checked_sub(amount).ok_or(BalanceError::Overflow)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceError {
    Insufficient { balance: Amount, requested: Amount },
    NegativeDebit(Amount),
    Overflow,
}

impl std::fmt::Display for BalanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BalanceError::Insufficient { balance, requested } => write!(
                f,
                "The account balance {} is smaller than spending tokens {}",
                balance, requested
            ),
            BalanceError::NegativeDebit(amount) => {
                write!(f, "Cannot spend a negative amount: {}", amount)
            }
            BalanceError::Overflow => write!(f, "Balance arithmetic overflowed"),
        }
    }
}

impl std::error::Error for BalanceError {}
