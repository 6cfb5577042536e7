use serde::{Deserialize, Serialize};

use super::Amount;

/// Exchange terms for turning tokens into a voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherSchedule {
    /// Largest voucher granted by a single exchange
    pub max_voucher: Amount,
    /// Voucher value of one token
    pub token_to_voucher_rate: Amount,
}

impl Default for VoucherSchedule {
    fn default() -> Self {
        Self {
            max_voucher: Amount::from_micros(300_000),
            token_to_voucher_rate: Amount::from_micros(200_000),
        }
    }
}

/// Outcome of pricing an exchange before any tokens are debited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoucherQuote {
    /// Tokens actually debited from the account
    pub spend: Amount,
    /// Voucher value granted
    pub voucher: Amount,
    /// True when the voucher hit `max_voucher` and fewer tokens are spent
    pub capped: bool,
}

impl VoucherSchedule {
    /// Price an exchange of `tokens`.
    ///
    /// When `tokens * rate` exceeds the cap, the voucher is clamped to the cap
    /// and only `max_voucher / rate` tokens are spent. Returns `None` if the
    /// arithmetic overflows or the rate is zero.
    pub fn quote(&self, tokens: Amount) -> Option<VoucherQuote> {
        let tentative = tokens.checked_mul(self.token_to_voucher_rate)?;
        if tentative <= self.max_voucher {
            return Some(VoucherQuote {
                spend: tokens,
                voucher: tentative,
                capped: false,
            });
        }

        let spend = self.max_voucher.checked_div(self.token_to_voucher_rate)?;
        Some(VoucherQuote {
            spend,
            voucher: self.max_voucher,
            capped: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_quote_below_cap() {
        let quote = VoucherSchedule::default().quote(amount("1.0")).unwrap();
        assert_eq!(quote.spend, amount("1.0"));
        assert_eq!(quote.voucher, amount("0.2"));
        assert!(!quote.capped);
    }

    #[test]
    fn test_quote_exactly_at_cap() {
        let quote = VoucherSchedule::default().quote(amount("1.5")).unwrap();
        assert_eq!(quote.spend, amount("1.5"));
        assert_eq!(quote.voucher, amount("0.3"));
        assert!(!quote.capped);
    }

    #[test]
    fn test_quote_capped() {
        let quote = VoucherSchedule::default().quote(amount("5.0")).unwrap();
        assert_eq!(quote.spend, amount("1.5"));
        assert_eq!(quote.voucher, amount("0.3"));
        assert!(quote.capped);
    }

    #[test]
    fn test_quote_zero_rate() {
        let schedule = VoucherSchedule {
            max_voucher: amount("0.3"),
            token_to_voucher_rate: Amount::ZERO,
        };
        // Nothing ever exceeds the cap at a zero rate
        let quote = schedule.quote(amount("10")).unwrap();
        assert_eq!(quote.voucher, Amount::ZERO);
        assert_eq!(quote.spend, amount("10"));
    }

    #[test]
    fn test_quote_custom_terms() {
        let schedule = VoucherSchedule {
            max_voucher: amount("10"),
            token_to_voucher_rate: amount("0.5"),
        };
        let quote = schedule.quote(amount("30")).unwrap();
        assert_eq!(quote.spend, amount("20"));
        assert_eq!(quote.voucher, amount("10"));
        assert!(quote.capped);
    }
}
