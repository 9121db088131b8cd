use crate::normalize::{RiskItem, RiskLevel};
use serde::{Deserialize, Serialize};

/// Per-level risk counts. Always recomputed from the full item list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl RiskDistribution {
    /// Levels outside LOW/MEDIUM/HIGH are not counted.
    pub fn from_items(items: &[RiskItem]) -> Self {
        items.iter().fold(Self::default(), |mut acc, item| {
            match item.level {
                RiskLevel::Low => acc.low += 1,
                RiskLevel::Medium => acc.medium += 1,
                RiskLevel::High => acc.high += 1,
                RiskLevel::Other(_) => {}
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }

    /// Counts in fixed LOW, MEDIUM, HIGH order.
    pub fn buckets(&self) -> [(RiskLevel, usize); 3] {
        [
            (RiskLevel::Low, self.low),
            (RiskLevel::Medium, self.medium),
            (RiskLevel::High, self.high),
        ]
    }
}
