//! Restore tier selection
//!
//! Decides which stored data a restore run trusts. Tiers are walked once,
//! in the configured order; a tier that is missing or fails validation
//! hands over to the next and is never consulted again. Deciding only
//! reads from disk, so the same on-disk state always yields the same mode.

use serde::Deserialize;

use crate::archive::StateArchive;
use crate::snapshot::{SessionSnapshot, SnapshotStore, TraditionalEntry};

/// A source of restorable state, best first by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Checksummed state archive
    Alternate,
    /// Structured snapshot files
    Enhanced,
    /// Flat application list
    Traditional,
}

impl Tier {
    pub fn default_order() -> Vec<Tier> {
        vec![Tier::Alternate, Tier::Enhanced, Tier::Traditional]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Alternate => "alternate",
            Tier::Enhanced => "enhanced",
            Tier::Traditional => "traditional",
        }
    }
}

/// What a restore run will replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreMode {
    Alternate(SessionSnapshot),
    Enhanced(SessionSnapshot),
    Traditional(Vec<TraditionalEntry>),
    Unavailable,
}

impl RestoreMode {
    pub fn tier(&self) -> Option<Tier> {
        match self {
            RestoreMode::Alternate(_) => Some(Tier::Alternate),
            RestoreMode::Enhanced(_) => Some(Tier::Enhanced),
            RestoreMode::Traditional(_) => Some(Tier::Traditional),
            RestoreMode::Unavailable => None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.tier().map(|t| t.as_str()).unwrap_or("unavailable")
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, RestoreMode::Unavailable)
    }
}

/// Why a tier was passed over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDown {
    pub tier: Tier,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub mode: RestoreMode,
    /// Tiers rejected before the chosen one, in the order tried
    pub step_downs: Vec<StepDown>,
}

pub struct FallbackManager<'a> {
    store: &'a SnapshotStore,
    archive: &'a StateArchive,
    order: Vec<Tier>,
}

impl<'a> FallbackManager<'a> {
    pub fn new(store: &'a SnapshotStore, archive: &'a StateArchive, order: &[Tier]) -> Self {
        let mut deduped: Vec<Tier> = Vec::with_capacity(order.len());
        for tier in order {
            if !deduped.contains(tier) {
                deduped.push(*tier);
            }
        }
        Self {
            store,
            archive,
            order: deduped,
        }
    }

    /// Same store and archive, but `first` is tried before the rest of the order
    pub fn preferring(self, first: Tier) -> Self {
        let mut order = vec![first];
        order.extend(self.order.iter().copied().filter(|t| *t != first));
        Self { order, ..self }
    }

    pub fn order(&self) -> &[Tier] {
        &self.order
    }

    pub fn decide(&self) -> Decision {
        let mut step_downs = Vec::new();

        for tier in &self.order {
            match self.try_tier(*tier) {
                Ok(mode) => {
                    tracing::info!(
                        tier = tier.as_str(),
                        skipped = step_downs.len(),
                        "Selected restore tier"
                    );
                    return Decision { mode, step_downs };
                }
                Err(reason) => {
                    tracing::warn!(tier = tier.as_str(), reason = %reason, "Stepping down a restore tier");
                    step_downs.push(StepDown {
                        tier: *tier,
                        reason,
                    });
                }
            }
        }

        Decision {
            mode: RestoreMode::Unavailable,
            step_downs,
        }
    }

    fn try_tier(&self, tier: Tier) -> Result<RestoreMode, String> {
        match tier {
            Tier::Alternate => self
                .archive
                .load_validated()
                .map(RestoreMode::Alternate)
                .map_err(|e| e.to_string()),
            Tier::Enhanced => self
                .store
                .load_enhanced()
                .map(RestoreMode::Enhanced)
                .map_err(|e| e.to_string()),
            Tier::Traditional => self
                .store
                .load_traditional()
                .map(RestoreMode::Traditional)
                .map_err(|e| e.to_string()),
        }
    }
}
