use crate::config::SettlementConfig;
use crate::domain::ports::{SettlementOutcome, SettlementSimulator};
use crate::domain::transaction::TransactionType;
use async_trait::async_trait;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Simulated rail: the configured delay per type and a random outcome drawn
/// with the configured success probability.
#[derive(Debug, Clone)]
pub struct RandomSettlementSimulator {
    config: SettlementConfig,
}

impl RandomSettlementSimulator {
    /// Creates a simulator that draws each outcome from `config`.
    pub fn new(config: SettlementConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SettlementSimulator for RandomSettlementSimulator {
    async fn run(&self, kind: TransactionType) -> SettlementOutcome {
        let profile = self.config.profile(kind);
        SettlementOutcome {
            delay: profile.delay(),
            success: rand::thread_rng().gen_bool(profile.success_rate.clamp(0.0, 1.0)),
        }
    }
}

/// Settlement with predetermined outcomes.
///
/// Scripted outcomes are consumed in order; once they run out every
/// settlement resolves to the fallback.
#[derive(Debug)]
pub struct DeterministicSimulator {
    fallback: SettlementOutcome,
    script: Mutex<VecDeque<SettlementOutcome>>,
}

impl DeterministicSimulator {
    /// Every settlement answers `success` after `delay`.
    pub fn new(success: bool, delay: Duration) -> Self {
        Self {
            fallback: SettlementOutcome { delay, success },
            script: Mutex::new(VecDeque::new()),
        }
    }

    /// Every settlement succeeds immediately.
    pub fn always_succeed() -> Self {
        Self::new(true, Duration::ZERO)
    }

    /// Every settlement fails immediately.
    pub fn always_fail() -> Self {
        Self::new(false, Duration::ZERO)
    }

    /// Answers with `outcomes` in order, then falls back to the fixed outcome.
    pub fn with_script(self, outcomes: impl IntoIterator<Item = SettlementOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            ..self
        }
    }

    fn next(&self) -> SettlementOutcome {
        match self.script.lock() {
            Ok(mut script) => script.pop_front().unwrap_or(self.fallback),
            Err(poisoned) => poisoned.into_inner().pop_front().unwrap_or(self.fallback),
        }
    }
}

#[async_trait]
impl SettlementSimulator for DeterministicSimulator {
    async fn run(&self, _kind: TransactionType) -> SettlementOutcome {
        self.next()
    }
}
