use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{NoiseParams, TransducerLayout, WindowBounds};
use crate::echo::{classify_echoes, reduce, reject_isolated, EchoEvent, TransducerId, Wall};

/// Reduced timestamps of one transducer, at most one per wall.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WallTimestamps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anterior: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posterior: Option<f64>,
}

impl WallTimestamps {
    pub fn get(&self, wall: Wall) -> Option<f64> {
        match wall {
            Wall::Anterior => self.anterior,
            Wall::Posterior => self.posterior,
        }
    }

    fn set(&mut self, wall: Wall, value: Option<f64>) {
        match wall {
            Wall::Anterior => self.anterior = value,
            Wall::Posterior => self.posterior = value,
        }
    }

    /// Present values in wall order (anterior first).
    pub fn iter(&self) -> impl Iterator<Item = (Wall, f64)> + '_ {
        Wall::ALL
            .into_iter()
            .filter_map(move |w| self.get(w).map(|t| (w, t)))
    }

    pub fn count(&self) -> usize {
        self.anterior.is_some() as usize + self.posterior.is_some() as usize
    }
}

/// Per-transducer reduced wall timestamps for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefinedTimestamps {
    by_transducer: BTreeMap<TransducerId, WallTimestamps>,
}

impl RefinedTimestamps {
    /// One empty entry per layout transducer.
    pub fn empty(layout: &TransducerLayout) -> Self {
        Self {
            by_transducer: layout
                .ids()
                .map(|id| (id, WallTimestamps::default()))
                .collect(),
        }
    }

    pub fn get(&self, id: TransducerId) -> Option<&WallTimestamps> {
        self.by_transducer.get(&id)
    }

    pub fn insert(&mut self, id: TransducerId, walls: WallTimestamps) {
        self.by_transducer.insert(id, walls);
    }

    /// Entries in transducer id order.
    pub fn iter(&self) -> impl Iterator<Item = (TransducerId, &WallTimestamps)> + '_ {
        self.by_transducer.iter().map(|(&id, w)| (id, w))
    }

    /// Number of (transducer, wall) pairs holding a value.
    pub fn measurement_count(&self) -> usize {
        self.by_transducer.values().map(WallTimestamps::count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_transducer.is_empty()
    }
}

/// Classify, denoise and reduce all events of one session.
///
/// Events are grouped per layout transducer in capture order. Events for
/// transducers absent from `layout` are dropped.
pub fn refine_timestamps(
    events: &[EchoEvent],
    layout: &TransducerLayout,
    windows: &WindowBounds,
    noise: &NoiseParams,
) -> RefinedTimestamps {
    let mut grouped: BTreeMap<TransducerId, Vec<f64>> =
        layout.ids().map(|id| (id, Vec::new())).collect();
    let mut n_unknown = 0usize;
    for ev in events {
        match grouped.get_mut(&ev.transducer) {
            Some(ts) => ts.push(ev.timestamp_us),
            None => n_unknown += 1,
        }
    }
    if n_unknown > 0 {
        tracing::warn!(
            "dropped {} events from transducers outside the layout",
            n_unknown
        );
    }

    let mut refined = RefinedTimestamps::empty(layout);
    for (id, timestamps) in &grouped {
        let classified = classify_echoes(timestamps, windows);
        let mut walls = WallTimestamps::default();
        for wall in Wall::ALL {
            let candidates = classified.wall(wall);
            let kept = reject_isolated(candidates, noise.tolerance_us);
            let value = reduce(&kept, windows.window(wall).reduction);
            tracing::trace!(
                "{} {:?}: {} candidates, {} corroborated, value={:?}",
                id,
                wall,
                candidates.len(),
                kept.len(),
                value
            );
            walls.set(wall, value);
        }
        refined.insert(*id, walls);
    }
    refined
}
