//! Echo events and the per-window timestamp stages.
//!
//! Raw echoes pass through three pure stages per transducer:
//! classification into anterior/posterior windows, isolated-sample noise
//! rejection, and reduction to one representative timestamp per window.

mod classify;
mod noise;
mod reduce;

pub use classify::{classify_echoes, ClassifiedEchoes};
pub use noise::reject_isolated;
pub use reduce::{reduce, ReductionStrategy};

use serde::{Deserialize, Serialize};

/// Identifier of one piezoelectric transducer in the layout.
///
/// Ids are 1-based; `0` never names a transducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransducerId(pub u8);

impl std::fmt::Display for TransducerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Cavity wall that produced an echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wall {
    /// Near-side wall (earlier arrival).
    Anterior,
    /// Far-side wall (later arrival).
    Posterior,
}

impl Wall {
    /// Both walls in arrival order.
    pub const ALL: [Wall; 2] = [Wall::Anterior, Wall::Posterior];
}

/// One timestamped echo detected by upstream waveform processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EchoEvent {
    /// Transducer that received the echo.
    pub transducer: TransducerId,
    /// Round-trip time of flight in microseconds.
    pub timestamp_us: f64,
}

impl EchoEvent {
    pub fn new(transducer: u8, timestamp_us: f64) -> Self {
        Self {
            transducer: TransducerId(transducer),
            timestamp_us,
        }
    }
}
