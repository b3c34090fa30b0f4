//! Remaining-life estimation from device-family specific attributes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::collector::parser::parse_leading_number;
use crate::storage::model::{HealthAttribute, KeyValueMetrics};

/// Key of the NVMe smart-log entry holding consumed endurance.
pub const NVME_PERCENTAGE_USED: &str = "Percentage Used";

/// SATA attribute names whose normalized value tracks remaining endurance.
pub const WEAR_ATTRIBUTE_NAMES: [&str; 2] = ["Media_Wearout_Indicator", "Wear_Leveling_Count"];

/// Sentinel used where a plain number is required for an unknown estimate.
pub const UNKNOWN_LIFE_SENTINEL: f64 = -1.0;

/// Estimated remaining endurance of a device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LifeRemaining {
    /// Remaining life in percent, 0-100.
    Percent(f64),
    /// No usable wear indicator was reported.
    Unknown,
}

impl LifeRemaining {
    /// Percentage, or `None` when unknown.
    pub fn percent(self) -> Option<f64> {
        match self {
            LifeRemaining::Percent(p) => Some(p),
            LifeRemaining::Unknown => None,
        }
    }

    /// Percentage, or [`UNKNOWN_LIFE_SENTINEL`] when unknown.
    pub fn as_sentinel(self) -> f64 {
        self.percent().unwrap_or(UNKNOWN_LIFE_SENTINEL)
    }

    pub fn is_known(self) -> bool {
        matches!(self, LifeRemaining::Percent(_))
    }
}

impl fmt::Display for LifeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifeRemaining::Percent(p) => write!(f, "{}%", p),
            LifeRemaining::Unknown => write!(f, "unknown"),
        }
    }
}

/// `100 - Percentage Used` from an NVMe smart-log, clamped to 0..=100.
///
/// Drives report usage above 100% once past their rated endurance.
pub fn life_from_nvme_metrics(metrics: &KeyValueMetrics) -> LifeRemaining {
    metrics
        .get(NVME_PERCENTAGE_USED)
        .and_then(|value| parse_leading_number(value))
        .map_or(LifeRemaining::Unknown, |used| {
            LifeRemaining::Percent((100.0 - used).clamp(0.0, 100.0))
        })
}

/// Current value of the first wear indicator attribute, clamped to 0..=100.
pub fn life_from_health_attributes(attributes: &[HealthAttribute]) -> LifeRemaining {
    attributes
        .iter()
        .find(|attr| WEAR_ATTRIBUTE_NAMES.iter().any(|name| attr.name.contains(name)))
        .map_or(LifeRemaining::Unknown, |attr| {
            LifeRemaining::Percent(f64::from(attr.current).clamp(0.0, 100.0))
        })
}
