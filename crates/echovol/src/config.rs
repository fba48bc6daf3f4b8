//! Pipeline configuration.
//!
//! Every physical constant the estimator depends on (window bounds, speed of
//! sound, transducer positions, parameter bounds) lives here and is passed in
//! by the caller. `Default` is the in-vivo deployment preset.

use serde::{Deserialize, Serialize};

use crate::echo::{ReductionStrategy, TransducerId, Wall};
use crate::error::ConfigError;

/// Speed of sound in water used by the in-vivo deployment (m/s).
pub const DEFAULT_SOUND_SPEED_M_S: f64 = 1420.0;

/// Adjacency tolerance of the noise rejector (µs).
///
/// The acquisition clock period is 0.5 µs; the margin absorbs jitter.
pub const DEFAULT_NOISE_TOLERANCE_US: f64 = 0.7;

/// Side length of the default square transducer grid (mm).
const DEFAULT_GRID_PITCH_MM: f64 = 13.0;

// ── Windows ────────────────────────────────────────────────────────────────

/// Arrival-time window for one wall, with its reduction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EchoWindow {
    /// Exclusive lower bound (µs).
    pub low_us: f64,
    /// Exclusive upper bound (µs).
    pub high_us: f64,
    /// How surviving candidates in this window are reduced.
    #[serde(default)]
    pub reduction: ReductionStrategy,
}

impl EchoWindow {
    pub fn new(low_us: f64, high_us: f64, reduction: ReductionStrategy) -> Self {
        Self {
            low_us,
            high_us,
            reduction,
        }
    }

    /// Whether `t` lies strictly inside the window.
    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        t > self.low_us && t < self.high_us
    }

    fn validate(&self, wall: Wall) -> Result<(), ConfigError> {
        if !self.low_us.is_finite() || !self.high_us.is_finite() || self.low_us >= self.high_us {
            return Err(ConfigError::InvalidWindow {
                wall,
                low_us: self.low_us,
                high_us: self.high_us,
            });
        }
        Ok(())
    }
}

/// Anterior and posterior arrival windows shared by all transducers of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub anterior: EchoWindow,
    pub posterior: EchoWindow,
}

impl WindowBounds {
    pub fn new(anterior: EchoWindow, posterior: EchoWindow) -> Self {
        Self {
            anterior,
            posterior,
        }
    }

    /// In-vivo bladder windows: anterior (15, 40) µs, posterior (105, 120) µs, both mean.
    pub fn in_vivo() -> Self {
        Self::new(
            EchoWindow::new(15.0, 40.0, ReductionStrategy::Mean),
            EchoWindow::new(105.0, 120.0, ReductionStrategy::Mean),
        )
    }

    /// Window for one wall.
    pub fn window(&self, wall: Wall) -> &EchoWindow {
        match wall {
            Wall::Anterior => &self.anterior,
            Wall::Posterior => &self.posterior,
        }
    }

    /// Check both windows and that they do not overlap.
    ///
    /// Windows may share an edge: bounds are exclusive, so a timestamp on the
    /// shared edge belongs to neither.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.anterior.validate(Wall::Anterior)?;
        self.posterior.validate(Wall::Posterior)?;
        if self.anterior.high_us > self.posterior.low_us {
            return Err(ConfigError::OverlappingWindows {
                anterior_high_us: self.anterior.high_us,
                posterior_low_us: self.posterior.low_us,
            });
        }
        Ok(())
    }
}

impl Default for WindowBounds {
    fn default() -> Self {
        Self::in_vivo()
    }
}

// ── Layout ─────────────────────────────────────────────────────────────────

/// Fixed mounting position of one transducer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransducerMount {
    pub id: TransducerId,
    /// Lateral position (x, y) in mm.
    pub xy_mm: [f64; 2],
}

/// Mounting positions of all transducers on the probe face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransducerLayout {
    mounts: Vec<TransducerMount>,
}

impl TransducerLayout {
    /// Build a layout from `(id, [x, y])` pairs.
    pub fn from_positions(positions: &[(u8, [f64; 2])]) -> Self {
        Self {
            mounts: positions
                .iter()
                .map(|&(id, xy_mm)| TransducerMount {
                    id: TransducerId(id),
                    xy_mm,
                })
                .collect(),
        }
    }

    /// Four transducers on the corners of a 13 × 13 mm square.
    pub fn square_grid() -> Self {
        let p = DEFAULT_GRID_PITCH_MM;
        Self::from_positions(&[(1, [0.0, 0.0]), (2, [p, 0.0]), (3, [0.0, p]), (4, [p, p])])
    }

    /// Position of a transducer, if it is part of the layout.
    pub fn position(&self, id: TransducerId) -> Option<[f64; 2]> {
        self.mounts.iter().find(|m| m.id == id).map(|m| m.xy_mm)
    }

    pub fn mounts(&self) -> &[TransducerMount] {
        &self.mounts
    }

    /// Transducer ids in layout order.
    pub fn ids(&self) -> impl Iterator<Item = TransducerId> + '_ {
        self.mounts.iter().map(|m| m.id)
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mounts.is_empty() {
            return Err(ConfigError::EmptyLayout);
        }
        for (i, m) in self.mounts.iter().enumerate() {
            if m.id.0 == 0 {
                return Err(ConfigError::UnknownTransducer(m.id));
            }
            if self.mounts[..i].iter().any(|other| other.id == m.id) {
                return Err(ConfigError::DuplicateTransducer(m.id));
            }
            if !m.xy_mm[0].is_finite() || !m.xy_mm[1].is_finite() {
                return Err(ConfigError::InvalidPosition(m.id));
            }
        }
        Ok(())
    }
}

impl Default for TransducerLayout {
    fn default() -> Self {
        Self::square_grid()
    }
}

// ── Noise ──────────────────────────────────────────────────────────────────

/// Isolated-sample rejection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    /// Maximum gap (µs, exclusive) to an adjacent timestamp for corroboration.
    pub tolerance_us: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            tolerance_us: DEFAULT_NOISE_TOLERANCE_US,
        }
    }
}

// ── Fit ────────────────────────────────────────────────────────────────────

/// Geometric primitive fitted to the surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitModel {
    /// Center and radius (4 parameters).
    #[default]
    Sphere,
    /// Center and axis-aligned semi-axes (6 parameters).
    Ellipsoid,
}

impl FitModel {
    /// Number of free parameters.
    pub fn n_params(self) -> usize {
        match self {
            Self::Sphere => 4,
            Self::Ellipsoid => 6,
        }
    }
}

impl std::str::FromStr for FitModel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sphere" | "spherical" => Ok(Self::Sphere),
            "ellipsoid" => Ok(Self::Ellipsoid),
            _ => Err(ConfigError::UnsupportedFitModel(s.to_string())),
        }
    }
}

/// Box constraints on the fitted parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitBounds {
    /// Range for the center x and y (mm).
    pub lateral_mm: [f64; 2],
    /// Range for the center depth z (mm).
    pub depth_mm: [f64; 2],
    /// Smallest admissible radius / semi-axis (mm).
    pub min_radius_mm: f64,
    /// Largest physiological volume (mL); fixes the sphere radius upper bound.
    pub max_volume_ml: f64,
    /// Largest admissible ellipsoid semi-axis (mm).
    pub max_semi_axis_mm: f64,
}

impl FitBounds {
    /// Sphere radius whose volume equals `max_volume_ml`.
    pub fn max_radius_mm(&self) -> f64 {
        let v_mm3 = self.max_volume_ml * 1000.0;
        (3.0 * v_mm3 / (4.0 * std::f64::consts::PI)).cbrt()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_range("fit.bounds.lateral_mm", self.lateral_mm)?;
        check_range("fit.bounds.depth_mm", self.depth_mm)?;
        check_positive("fit.bounds.min_radius_mm", self.min_radius_mm)?;
        check_positive("fit.bounds.max_volume_ml", self.max_volume_ml)?;
        check_range(
            "fit.bounds.radius_mm",
            [self.min_radius_mm, self.max_radius_mm()],
        )?;
        check_range(
            "fit.bounds.semi_axis_mm",
            [self.min_radius_mm, self.max_semi_axis_mm],
        )
    }
}

impl Default for FitBounds {
    fn default() -> Self {
        Self {
            lateral_mm: [-20.0, 20.0],
            depth_mm: [5.0, 170.0],
            min_radius_mm: 5.0,
            max_volume_ml: 1000.0,
            max_semi_axis_mm: 100.0,
        }
    }
}

/// Optimizer backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverBackend {
    /// Levenberg-Marquardt with every step projected onto the parameter box.
    #[default]
    ProjectedLm,
    /// Unbounded Levenberg-Marquardt (`tiny-solver`); out-of-box results are rejected.
    TinySolver,
}

/// Optimizer budget and stopping tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    pub backend: SolverBackend,
    /// Maximum outer iterations.
    pub max_iters: usize,
    /// Relative cost-decrease tolerance.
    pub ftol: f64,
    /// Relative step-size tolerance.
    pub xtol: f64,
    /// Projected-gradient tolerance.
    pub gtol: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            backend: SolverBackend::default(),
            max_iters: 200,
            ftol: 1e-12,
            xtol: 1e-10,
            gtol: 1e-10,
        }
    }
}

/// Geometric fit configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub model: FitModel,
    pub bounds: FitBounds,
    /// Starting radius (and semi-axes) of the optimizer (mm).
    pub initial_radius_mm: f64,
    pub solver: SolverParams,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            model: FitModel::default(),
            bounds: FitBounds::default(),
            initial_radius_mm: 50.0,
            solver: SolverParams::default(),
        }
    }
}

impl FitConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.bounds.validate()?;
        let upper = match self.model {
            FitModel::Sphere => self.bounds.max_radius_mm(),
            FitModel::Ellipsoid => self.bounds.max_semi_axis_mm,
        };
        if !self.initial_radius_mm.is_finite()
            || self.initial_radius_mm < self.bounds.min_radius_mm
            || self.initial_radius_mm > upper
        {
            return Err(ConfigError::InvalidParameter {
                name: "fit.initial_radius_mm",
                value: self.initial_radius_mm,
            });
        }
        if self.solver.max_iters == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "fit.solver.max_iters",
                value: 0.0,
            });
        }
        check_positive("fit.solver.ftol", self.solver.ftol)?;
        check_positive("fit.solver.xtol", self.solver.xtol)?;
        check_positive("fit.solver.gtol", self.solver.gtol)
    }
}

// ── Pipeline ───────────────────────────────────────────────────────────────

/// Full per-session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub layout: TransducerLayout,
    pub windows: WindowBounds,
    pub noise: NoiseParams,
    /// Speed of sound in the coupling medium (m/s).
    pub sound_speed_m_s: f64,
    pub fit: FitConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            layout: TransducerLayout::default(),
            windows: WindowBounds::default(),
            noise: NoiseParams::default(),
            sound_speed_m_s: DEFAULT_SOUND_SPEED_M_S,
            fit: FitConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Default configuration with custom windows.
    pub fn with_windows(windows: WindowBounds) -> Self {
        Self {
            windows,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// Missing sections fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.windows.validate()?;
        self.layout.validate()?;
        check_positive("noise.tolerance_us", self.noise.tolerance_us)?;
        check_positive("sound_speed_m_s", self.sound_speed_m_s)?;
        self.fit.validate()
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { name, value })
    }
}

fn check_range(name: &'static str, range: [f64; 2]) -> Result<(), ConfigError> {
    if range[0].is_finite() && range[1].is_finite() && range[0] < range[1] {
        Ok(())
    } else {
        Err(ConfigError::InvalidRange { name, range })
    }
}
