use crate::config::WindowBounds;

use super::Wall;

/// Timestamps of one transducer split by arrival window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedEchoes {
    /// Candidates inside the anterior window, in capture order.
    pub anteriors: Vec<f64>,
    /// Candidates inside the posterior window, in capture order.
    pub posteriors: Vec<f64>,
}

impl ClassifiedEchoes {
    /// Candidates for one wall.
    pub fn wall(&self, wall: Wall) -> &[f64] {
        match wall {
            Wall::Anterior => &self.anteriors,
            Wall::Posterior => &self.posteriors,
        }
    }

    /// Total number of in-window candidates.
    pub fn len(&self) -> usize {
        self.anteriors.len() + self.posteriors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition one transducer's timestamps into anterior and posterior candidates.
///
/// Window bounds are exclusive. Timestamps outside both windows (including
/// non-finite ones) are discarded. A timestamp is assigned to at most one
/// window, the anterior one taking precedence.
pub fn classify_echoes(timestamps_us: &[f64], windows: &WindowBounds) -> ClassifiedEchoes {
    let mut out = ClassifiedEchoes::default();
    for &t in timestamps_us {
        if windows.anterior.contains(t) {
            out.anteriors.push(t);
        } else if windows.posterior.contains(t) {
            out.posteriors.push(t);
        }
    }
    out
}
