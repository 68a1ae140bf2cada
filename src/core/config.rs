//! Engine configuration
//!
//! All money rules that are policy rather than invariant live here so they can
//! be tuned and tested without code changes.

use chrono::Duration;
use rust_decimal::Decimal;

use crate::types::WagerError;

/// Settlement policy parameters
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Share of a settled pool retained by the platform
    pub commission_rate: Decimal,
    pub min_stake: Decimal,
    pub max_stake: Decimal,
    /// Stakes must be a multiple of this
    pub stake_step: Decimal,
    /// Time from room creation to its result deadline
    pub room_duration: Duration,
    /// Smallest withdrawal an account may request
    pub min_withdrawal: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            commission_rate: Decimal::new(20, 2),
            min_stake: Decimal::new(20, 0),
            max_stake: Decimal::new(1000, 0),
            stake_step: Decimal::new(5, 0),
            room_duration: Duration::hours(1),
            min_withdrawal: Decimal::new(150, 0),
        }
    }
}

impl EngineConfig {
    /// Check that the parameters describe a usable policy
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if:
    /// - the commission rate is outside `[0, 1)`
    /// - the stake bounds are not positive or are inverted
    /// - the stake step is not positive
    /// - the room duration is not positive
    /// - the minimum withdrawal is not positive
    pub fn validate(&self) -> Result<(), WagerError> {
        if self.commission_rate < Decimal::ZERO || self.commission_rate >= Decimal::ONE {
            return Err(WagerError::invalid_config(format!(
                "commission rate {} must be in [0, 1)",
                self.commission_rate
            )));
        }
        if self.min_stake <= Decimal::ZERO || self.max_stake < self.min_stake {
            return Err(WagerError::invalid_config(format!(
                "stake range [{}, {}] is empty or not positive",
                self.min_stake, self.max_stake
            )));
        }
        if self.stake_step <= Decimal::ZERO {
            return Err(WagerError::invalid_config(format!(
                "stake step {} must be positive",
                self.stake_step
            )));
        }
        if self.room_duration <= Duration::zero() {
            return Err(WagerError::invalid_config("room duration must be positive"));
        }
        if self.min_withdrawal <= Decimal::ZERO {
            return Err(WagerError::invalid_config(format!(
                "minimum withdrawal {} must be positive",
                self.min_withdrawal
            )));
        }
        Ok(())
    }

    /// Whether `stake` is inside the range and on the step grid
    pub fn is_valid_stake(&self, stake: Decimal) -> bool {
        stake >= self.min_stake
            && stake <= self.max_stake
            && (stake % self.stake_step).is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.commission_rate, Decimal::new(2, 1));
    }

    #[rstest]
    #[case::below_min(Decimal::new(17, 0), false)]
    #[case::min(Decimal::new(20, 0), true)]
    #[case::middle(Decimal::new(500, 0), true)]
    #[case::max(Decimal::new(1000, 0), true)]
    #[case::above_max(Decimal::new(1005, 0), false)]
    #[case::off_grid(Decimal::new(22, 0), false)]
    #[case::fractional(Decimal::new(225, 1), false)]
    fn test_stake_validation(#[case] stake: Decimal, #[case] expected: bool) {
        assert_eq!(EngineConfig::default().is_valid_stake(stake), expected);
    }

    #[rstest]
    #[case::rate_one(EngineConfig { commission_rate: Decimal::ONE, ..EngineConfig::default() })]
    #[case::rate_negative(EngineConfig { commission_rate: Decimal::new(-1, 2), ..EngineConfig::default() })]
    #[case::inverted_range(EngineConfig { min_stake: Decimal::new(500, 0), max_stake: Decimal::new(100, 0), ..EngineConfig::default() })]
    #[case::zero_step(EngineConfig { stake_step: Decimal::ZERO, ..EngineConfig::default() })]
    #[case::zero_duration(EngineConfig { room_duration: Duration::zero(), ..EngineConfig::default() })]
    #[case::zero_withdrawal(EngineConfig { min_withdrawal: Decimal::ZERO, ..EngineConfig::default() })]
    fn test_invalid_configs_rejected(#[case] config: EngineConfig) {
        assert!(matches!(
            config.validate(),
            Err(WagerError::InvalidConfig { .. })
        ));
    }
}
