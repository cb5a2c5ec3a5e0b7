//! Credit balance rules.

use crate::error::CoreError;

/// Cost in points of one generation job, however many positions it covers.
pub const COST_PER_GENERATION: i64 = 1;

/// Points granted to a freshly created user.
pub const DEFAULT_FREE_CREDITS: i64 = 3;

/// Compute the balance after debiting `cost`, refusing to go negative.
pub fn debit(balance: i64, cost: i64) -> Result<i64, CoreError> {
    if balance < cost {
        return Err(CoreError::FailedPrecondition(
            "Insufficient points. Please purchase more credits to generate.".into(),
        ));
    }
    Ok(balance - cost)
}

/// Compute the balance after a grant. Grants must be positive.
pub fn credit(balance: i64, amount: i64) -> Result<i64, CoreError> {
    if amount <= 0 {
        return Err(CoreError::Validation("amount must be a positive number.".into()));
    }
    Ok(balance.max(0).saturating_add(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_exact_balance_reaches_zero() {
        assert_eq!(debit(1, COST_PER_GENERATION).unwrap(), 0);
    }

    #[test]
    fn debit_refuses_insufficient_balance() {
        let err = debit(0, COST_PER_GENERATION).unwrap_err();
        assert!(matches!(err, CoreError::FailedPrecondition(_)));
    }

    #[test]
    fn credit_rejects_non_positive() {
        assert!(credit(5, 0).is_err());
        assert!(credit(5, -2).is_err());
    }

    #[test]
    fn credit_clamps_negative_balance() {
        assert_eq!(credit(-4, 2).unwrap(), 2);
    }
}
