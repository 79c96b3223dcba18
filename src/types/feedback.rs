//! Satisfaction score captured at the end of a call

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SatisfactionScore {
    Satisfied,
    Unsatisfied,
}

impl SatisfactionScore {
    /// Stored value: 1 = satisfied, 2 = unsatisfied
    pub fn value(&self) -> i64 {
        match self {
            SatisfactionScore::Satisfied => 1,
            SatisfactionScore::Unsatisfied => 2,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(SatisfactionScore::Satisfied),
            2 => Some(SatisfactionScore::Unsatisfied),
            _ => None,
        }
    }
}

/// How a call ended, as recorded in the interaction log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Completed,
    Transferred,
    Abandoned,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Completed => "completed",
            CallStatus::Transferred => "transferred",
            CallStatus::Abandoned => "abandoned",
        }
    }
}
