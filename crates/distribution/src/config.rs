use std::str::FromStr;

use chrono::Duration;

use bookdist_core::{DomainError, DomainResult};

use crate::strategy::AllocationStrategy;

pub const DEFAULT_LOAN_PERIOD_DAYS: i64 = 180;

pub const ENV_LOAN_PERIOD_DAYS: &str = "BOOKDIST_LOAN_PERIOD_DAYS";
pub const ENV_STRATEGY: &str = "BOOKDIST_STRATEGY";

/// Settings for a [`crate::BooksDistributionSystem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemConfig {
    /// Days from issue until a loan is due.
    pub loan_period_days: i64,
    /// Strategy in force until changed with `set_strategy`.
    pub strategy: AllocationStrategy,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
            strategy: AllocationStrategy::default(),
        }
    }
}

impl SystemConfig {
    pub fn with_loan_period_days(mut self, days: i64) -> Self {
        self.loan_period_days = days;
        self
    }

    pub fn with_strategy(mut self, strategy: AllocationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Defaults overridden by `BOOKDIST_LOAN_PERIOD_DAYS` and `BOOKDIST_STRATEGY`.
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`SystemConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DomainResult<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_LOAN_PERIOD_DAYS) {
            config.loan_period_days = raw.trim().parse().map_err(|_| {
                DomainError::invalid_input(format!("{ENV_LOAN_PERIOD_DAYS}={raw:?} is not a number of days"))
            })?;
        }
        if let Some(raw) = lookup(ENV_STRATEGY) {
            config.strategy = AllocationStrategy::from_str(raw.trim())?;
        }

        config.loan_period()?;
        Ok(config)
    }

    /// Loan period as a duration. Must be at least one day.
    pub fn loan_period(&self) -> DomainResult<Duration> {
        if self.loan_period_days <= 0 {
            return Err(DomainError::invalid_input(format!(
                "loan period must be positive, got {} days",
                self.loan_period_days
            )));
        }
        Duration::try_days(self.loan_period_days).ok_or_else(|| {
            DomainError::invalid_input(format!("loan period of {} days is out of range", self.loan_period_days))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = SystemConfig::default();
        assert_eq!(config.loan_period_days, 180);
        assert_eq!(config.strategy, AllocationStrategy::PriorityBased);
        assert_eq!(config.loan_period().unwrap(), Duration::days(180));
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(SystemConfig::from_lookup(lookup(&[])).unwrap(), SystemConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = SystemConfig::from_lookup(lookup(&[
            (ENV_LOAN_PERIOD_DAYS, " 30 "),
            (ENV_STRATEGY, "equal"),
        ]))
        .unwrap();
        assert_eq!(config.loan_period_days, 30);
        assert_eq!(config.strategy, AllocationStrategy::Equal);
    }

    #[test]
    fn rejects_bad_values() {
        for vars in [
            [(ENV_LOAN_PERIOD_DAYS, "soon")],
            [(ENV_LOAN_PERIOD_DAYS, "0")],
            [(ENV_LOAN_PERIOD_DAYS, "-7")],
            [(ENV_STRATEGY, "lottery")],
        ] {
            let err = SystemConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, DomainError::InvalidInput(_)), "{vars:?}");
        }
    }

    #[test]
    fn builder_overrides() {
        let config = SystemConfig::default()
            .with_loan_period_days(14)
            .with_strategy(AllocationStrategy::NeedProportional);
        assert_eq!(config.loan_period().unwrap(), Duration::days(14));
        assert_eq!(config.strategy.name(), AllocationStrategy::NeedProportional.name());
    }
}
