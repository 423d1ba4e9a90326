use std::collections::BTreeMap;

use crate::eth::ErrorKind;

/// Mint counters for one account, merged by the caller for run totals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MintStats {
    pub minted: u64,
    pub failed: u64,
    pub gas_used: u64,
    /// Every failed attempt, retried or not
    pub errors: BTreeMap<ErrorKind, u64>,
}

impl MintStats {
    pub fn record_success(&mut self, gas_used: u64) {
        self.minted += 1;
        self.gas_used += gas_used;
    }

    /// An item whose last attempt failed
    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn record_error(&mut self, kind: ErrorKind) {
        *self.errors.entry(kind).or_default() += 1;
    }

    pub fn merge(&mut self, other: &MintStats) {
        self.minted += other.minted;
        self.failed += other.failed;
        self.gas_used += other.gas_used;
        for (kind, count) in &other.errors {
            *self.errors.entry(*kind).or_default() += count;
        }
    }

    pub fn average_gas(&self) -> Option<u64> {
        (self.minted > 0).then(|| self.gas_used / self.minted)
    }
}
