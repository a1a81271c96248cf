use serde::{Deserialize, Serialize};

/// Time at which an attribute is read or written. `Default` addresses the
/// non-animated opinion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum TimeCode {
    #[default]
    Default,
    At(f64),
}

impl TimeCode {
    pub fn is_default(&self) -> bool {
        matches!(self, TimeCode::Default)
    }

    pub fn sample(&self) -> Option<f64> {
        match self {
            TimeCode::Default => None,
            TimeCode::At(t) => Some(*t),
        }
    }
}
