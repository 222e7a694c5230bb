use serde::{Deserialize, Serialize};

/// A directed edge between two states of the same machine, followed when the
/// source state completes. Immutable once constructed; states are referenced
/// by name within the owning machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub name: String,
    pub from_state: String,
    pub to_state: String,
}

impl Transition {
    pub fn new(
        name: impl Into<String>,
        from_state: impl Into<String>,
        to_state: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_state: from_state.into(),
            to_state: to_state.into(),
        }
    }
}
