//! Funnel and step descriptors supplied by the funnel registry.

use serde::{Deserialize, Serialize};

/// One step of a funnel, ordered by `sequence`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelStepDef {
    pub id: String,
    pub name: String,
    pub sequence: i32,
}

impl FunnelStepDef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, sequence: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sequence,
        }
    }
}

/// A funnel as stored by the registry. The engine reads it and never validates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelDefinition {
    pub id: String,
    pub name: String,
    pub steps: Vec<FunnelStepDef>,
}

/// Sorts steps by `sequence`. Equal sequences keep the caller's order.
pub fn order_steps(steps: &[FunnelStepDef]) -> Vec<&FunnelStepDef> {
    let mut ordered: Vec<&FunnelStepDef> = steps.iter().collect();
    ordered.sort_by_key(|s| s.sequence);
    ordered
}
