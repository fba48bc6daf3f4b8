//! Shared synthetic-data helpers for unit tests.
//!
//! Surfaces are sampled the way the probe sees them: one vertical ray per
//! lateral position, hitting the near (anterior) and far (posterior) wall.

use crate::config::TransducerLayout;
use crate::echo::EchoEvent;

/// Half-spacing of the two echoes emitted per wall by [`paired_events`] (µs).
pub(crate) const PAIR_HALF_SPACING_US: f64 = 0.25;

/// `n x n` lateral positions spanning `[lo, hi]` on both axes (inclusive).
pub(crate) fn lateral_grid(lo: f64, hi: f64, n: usize) -> Vec<[f64; 2]> {
    let step = if n > 1 { (hi - lo) / (n - 1) as f64 } else { 0.0 };
    let mut out = Vec::with_capacity(n * n);
    for iy in 0..n {
        for ix in 0..n {
            out.push([lo + ix as f64 * step, lo + iy as f64 * step]);
        }
    }
    out
}

/// Near/far wall depths of a sphere along the vertical ray at `xy`.
pub(crate) fn sphere_wall_depths(center: [f64; 3], radius: f64, xy: [f64; 2]) -> Option<[f64; 2]> {
    let dx = xy[0] - center[0];
    let dy = xy[1] - center[1];
    let h2 = radius * radius - dx * dx - dy * dy;
    // Skip grazing rays: both walls would collapse onto one depth.
    if h2 <= 1.0 {
        return None;
    }
    let h = h2.sqrt();
    Some([center[2] - h, center[2] + h])
}

/// Near/far wall depths of an axis-aligned ellipsoid along the vertical ray at `xy`.
pub(crate) fn ellipsoid_wall_depths(center: [f64; 3], axes: [f64; 3], xy: [f64; 2]) -> Option<[f64; 2]> {
    let u = (xy[0] - center[0]) / axes[0];
    let v = (xy[1] - center[1]) / axes[1];
    let s = 1.0 - u * u - v * v;
    if s <= 0.05 {
        return None;
    }
    let h = axes[2] * s.sqrt();
    Some([center[2] - h, center[2] + h])
}

fn wall_points(
    lateral: &[[f64; 2]],
    depths: impl Fn([f64; 2]) -> Option<[f64; 2]>,
) -> Vec<[f64; 3]> {
    let mut out = Vec::with_capacity(2 * lateral.len());
    for &xy in lateral {
        if let Some([near, far]) = depths(xy) {
            out.push([xy[0], xy[1], near]);
            out.push([xy[0], xy[1], far]);
        }
    }
    out
}

/// Exact near and far wall points of a sphere under each lateral position.
pub(crate) fn sphere_wall_points(center: [f64; 3], radius: f64, lateral: &[[f64; 2]]) -> Vec<[f64; 3]> {
    wall_points(lateral, |xy| sphere_wall_depths(center, radius, xy))
}

/// Exact near and far wall points of an ellipsoid under each lateral position.
pub(crate) fn ellipsoid_wall_points(
    center: [f64; 3],
    axes: [f64; 3],
    lateral: &[[f64; 2]],
) -> Vec<[f64; 3]> {
    wall_points(lateral, |xy| ellipsoid_wall_depths(center, axes, xy))
}

/// Round-trip time of flight (µs) of a reflector at `depth_mm`.
pub(crate) fn depth_to_tof_us(depth_mm: f64, sound_speed_m_s: f64) -> f64 {
    2.0 * depth_mm / (sound_speed_m_s * 1e-3)
}

/// Two corroborating echoes centred on `t_us`; their mean is `t_us`.
pub(crate) fn paired_events(id: u8, t_us: f64) -> [EchoEvent; 2] {
    [
        EchoEvent::new(id, t_us - PAIR_HALF_SPACING_US),
        EchoEvent::new(id, t_us + PAIR_HALF_SPACING_US),
    ]
}

/// Events a sphere would produce for every transducer of `layout`.
///
/// Each wall contributes an echo pair, so the default noise filter keeps it.
pub(crate) fn sphere_session_events(
    center: [f64; 3],
    radius: f64,
    layout: &TransducerLayout,
    sound_speed_m_s: f64,
) -> Vec<EchoEvent> {
    let mut events = Vec::new();
    for mount in layout.mounts() {
        let Some(depths) = sphere_wall_depths(center, radius, mount.xy_mm) else {
            continue;
        };
        for z in depths {
            events.extend(paired_events(mount.id.0, depth_to_tof_us(z, sound_speed_m_s)));
        }
    }
    events
}
