//! Time-of-flight to surface coordinates.

use serde::{Deserialize, Serialize};

use crate::config::TransducerLayout;
use crate::echo::{TransducerId, Wall};
use crate::pipeline::RefinedTimestamps;

/// One point on the cavity surface, in probe coordinates (mm).
///
/// `x`/`y` are the transducer mounting position, `z` the one-way depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceCoordinate {
    /// Transducer whose echo produced the point.
    pub transducer: TransducerId,
    /// Wall the echo was attributed to.
    pub wall: Wall,
    pub x_mm: f64,
    pub y_mm: f64,
    pub z_mm: f64,
}

impl SurfaceCoordinate {
    #[inline]
    pub fn xyz(&self) -> [f64; 3] {
        [self.x_mm, self.y_mm, self.z_mm]
    }
}

/// One-way depth (mm) of a reflector from a round-trip time of flight (µs).
#[inline]
pub fn tof_to_depth_mm(timestamp_us: f64, sound_speed_m_s: f64) -> f64 {
    sound_speed_m_s * timestamp_us * 1e-3 / 2.0
}

/// Convert refined timestamps into surface coordinates.
///
/// Anterior and posterior points of all transducers are concatenated
/// (transducer id order, anterior first); the fit treats them as samples of
/// one closed surface. Transducers missing from `layout` contribute nothing.
pub fn map_coordinates(
    refined: &RefinedTimestamps,
    layout: &TransducerLayout,
    sound_speed_m_s: f64,
) -> Vec<SurfaceCoordinate> {
    let mut out = Vec::with_capacity(refined.measurement_count());
    for (id, walls) in refined.iter() {
        let Some([x, y]) = layout.position(id) else {
            continue;
        };
        for (wall, t_us) in walls.iter() {
            out.push(SurfaceCoordinate {
                transducer: id,
                wall,
                x_mm: x,
                y_mm: y,
                z_mm: tof_to_depth_mm(t_us, sound_speed_m_s),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::WallTimestamps;
    use approx::assert_relative_eq;

    #[test]
    fn depth_uses_half_round_trip() {
        assert_relative_eq!(tof_to_depth_mm(20.0, 1420.0), 14.2, epsilon = 1e-12);
        assert_relative_eq!(tof_to_depth_mm(110.0, 1420.0), 78.1, epsilon = 1e-12);
        assert_relative_eq!(tof_to_depth_mm(100.0, 1480.0), 74.0, epsilon = 1e-12);
    }

    #[test]
    fn maps_each_wall_to_its_own_point() {
        let layout = TransducerLayout::square_grid();
        let mut refined = RefinedTimestamps::empty(&layout);
        refined.insert(
            TransducerId(2),
            WallTimestamps {
                anterior: Some(20.0),
                posterior: Some(110.0),
            },
        );
        refined.insert(
            TransducerId(4),
            WallTimestamps {
                anterior: None,
                posterior: Some(110.0),
            },
        );

        let coords = map_coordinates(&refined, &layout, 1420.0);
        assert_eq!(coords.len(), 3);

        assert_eq!(coords[0].transducer, TransducerId(2));
        assert_eq!(coords[0].wall, Wall::Anterior);
        assert_eq!([coords[0].x_mm, coords[0].y_mm], [13.0, 0.0]);
        assert_relative_eq!(coords[0].z_mm, 14.2, epsilon = 1e-12);

        assert_eq!(coords[1].wall, Wall::Posterior);
        assert_relative_eq!(coords[1].z_mm, 78.1, epsilon = 1e-12);

        assert_eq!(coords[2].transducer, TransducerId(4));
        assert_eq!([coords[2].x_mm, coords[2].y_mm], [13.0, 13.0]);
    }

    #[test]
    fn unknown_transducers_are_skipped() {
        let layout = TransducerLayout::square_grid();
        let mut refined = RefinedTimestamps::empty(&layout);
        refined.insert(
            TransducerId(9),
            WallTimestamps {
                anterior: Some(20.0),
                posterior: None,
            },
        );
        assert!(map_coordinates(&refined, &layout, 1420.0).is_empty());
    }
}
