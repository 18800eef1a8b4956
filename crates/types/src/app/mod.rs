// Path: crates/types/src/app/mod.rs
//! Worker identities, per-worker dispatch outcomes and the counter record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The value a worker reports when it has no answer.
pub const NO_ANSWER_SENTINEL: f64 = -1.0;

/// An opaque handle into the external worker registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub u16);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for WorkerId {
    fn from(uid: u16) -> Self {
        Self(uid)
    }
}

/// Registry metadata for one worker, as published by the scoring loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub uid: WorkerId,
    /// Base URL the worker serves inference on, e.g. `http://10.0.0.5:8091`.
    pub endpoint: String,
    #[serde(default)]
    pub hotkey: String,
    #[serde(default)]
    pub coldkey: String,
    #[serde(default)]
    pub rank: f64,
    #[serde(default)]
    pub incentive: f64,
    #[serde(default)]
    pub emission: f64,
    /// Workers that are not serving are excluded from random sampling.
    #[serde(default = "default_serving")]
    pub serving: bool,
}

fn default_serving() -> bool {
    true
}

/// Why a worker produced no usable prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoAnswer {
    /// The call did not complete before the shared deadline.
    Timeout,
    /// The call failed at the transport level.
    Transport,
    /// The worker answered with the sentinel, a non-finite or out-of-range value.
    OutOfRange,
}

impl NoAnswer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::OutOfRange => "out_of_range",
        }
    }
}

/// The result of dispatching one request to one worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkerOutcome {
    /// A prediction inside `[0.0, 1.0]`.
    Prediction(f64),
    NoAnswer(NoAnswer),
}

impl WorkerOutcome {
    /// Classifies a raw value reported by a worker. `None` and the sentinel
    /// both mean the worker declined to answer.
    pub fn from_reported(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() && (0.0..=1.0).contains(&v) => Self::Prediction(v),
            _ => Self::NoAnswer(NoAnswer::OutOfRange),
        }
    }

    pub fn prediction(&self) -> Option<f64> {
        match self {
            Self::Prediction(v) => Some(*v),
            Self::NoAnswer(_) => None,
        }
    }

    /// Metric label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Prediction(_) => "valid",
            Self::NoAnswer(reason) => reason.as_str(),
        }
    }
}

/// Whether a forwarded request produced at least one valid prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    Failure,
}

/// The durable success/failure tally. Both counters only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failure_count: u64,
}

impl CounterState {
    /// Returns the state after recording `outcome`.
    pub fn record(self, outcome: RequestOutcome) -> Self {
        match outcome {
            RequestOutcome::Success => Self {
                success_count: self.success_count.saturating_add(1),
                ..self
            },
            RequestOutcome::Failure => Self {
                failure_count: self.failure_count.saturating_add(1),
                ..self
            },
        }
    }
}
