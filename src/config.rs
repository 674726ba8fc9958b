//! Pipeline configuration: layered TOML file + environment overrides.
//!
//! Search order mirrors the reference loader: an `avitrack.toml` in the
//! working directory, then `AVITRACK__SECTION__KEY`-prefixed environment
//! variables (double underscore separators, e.g.
//! `AVITRACK__TRACKING__MAX_DISTANCE=75`).

use serde::Deserialize;

use crate::error::PipelineError;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub temporal_filter: TemporalFilterConfig,
    #[serde(default)]
    pub spatial_filter: SpatialFilterConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_min_contour_area")]
    pub min_contour_area: f64,
    #[serde(default = "default_max_contour_area")]
    pub max_contour_area: f64,
    #[serde(default = "default_blur_kernel_size")]
    pub blur_kernel_size: i32,
    #[serde(default = "default_morph_kernel_size")]
    pub morph_kernel_size: i32,
    #[serde(default = "default_morph_iterations")]
    pub morph_iterations: i32,
    #[serde(default = "default_mog2_history")]
    pub mog2_history: i32,
    #[serde(default = "default_mog2_var_threshold")]
    pub mog2_var_threshold: f64,
}

fn default_min_contour_area() -> f64 {
    2000.0
}
fn default_max_contour_area() -> f64 {
    200_000.0
}
fn default_blur_kernel_size() -> i32 {
    5
}
fn default_morph_kernel_size() -> i32 {
    5
}
fn default_morph_iterations() -> i32 {
    2
}
fn default_mog2_history() -> i32 {
    500
}
fn default_mog2_var_threshold() -> f64 {
    16.0
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_contour_area: default_min_contour_area(),
            max_contour_area: default_max_contour_area(),
            blur_kernel_size: default_blur_kernel_size(),
            morph_kernel_size: default_morph_kernel_size(),
            morph_iterations: default_morph_iterations(),
            mog2_history: default_mog2_history(),
            mog2_var_threshold: default_mog2_var_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_max_disappeared")]
    pub max_disappeared: u32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
}

fn default_max_disappeared() -> u32 {
    30
}
fn default_max_distance() -> f64 {
    100.0
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_disappeared: default_max_disappeared(),
            max_distance: default_max_distance(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemporalFilterConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_min_confirm_frames")]
    pub min_confirm_frames: u32,
    #[serde(default = "default_min_move_distance")]
    pub min_move_distance: f64,
}

fn default_min_confirm_frames() -> u32 {
    15
}
fn default_min_move_distance() -> f64 {
    50.0
}

impl Default for TemporalFilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_confirm_frames: default_min_confirm_frames(),
            min_move_distance: default_min_move_distance(),
        }
    }
}

impl From<TemporalFilterConfig> for crate::tracker::TemporalFilterConfig {
    fn from(c: TemporalFilterConfig) -> Self {
        crate::tracker::TemporalFilterConfig {
            enabled: c.enabled,
            min_confirm_frames: c.min_confirm_frames,
            min_move_distance: c.min_move_distance,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpatialFilterConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_horizon_line_percent")]
    pub horizon_line_percent: f64,
}

fn default_horizon_line_percent() -> f64 {
    0.70
}

impl Default for SpatialFilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            horizon_line_percent: default_horizon_line_percent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_progress_interval")]
    pub progress_interval_frames: u64,
}

fn default_progress_interval() -> u64 {
    30
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            progress_interval_frames: default_progress_interval(),
        }
    }
}

/// Loads configuration from a TOML file (`avitrack` in the working
/// directory by default, or `config_path` when given via `--config`)
/// layered under `AVITRACK__`-prefixed environment variables, then
/// validates it. A malformed file, a type mismatch, or an out-of-range
/// value are all load-time failures that abort startup rather than
/// silently falling back to defaults — only `horizon_line_percent` gets the
/// warn-and-clamp treatment, applied later in `region_filter`.
pub fn load(config_path: Option<&str>) -> Result<AppConfig, PipelineError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(config_path.unwrap_or("avitrack")).required(false))
        .add_source(
            config::Environment::with_prefix("AVITRACK")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder
        .build()
        .map_err(|e| PipelineError::Config(e.to_string()))?
        .try_deserialize::<AppConfig>()
        .map_err(|e| PipelineError::Config(e.to_string()))?;

    validate(&config)?;
    Ok(config)
}

/// Out-of-range numeric rejection at load time. `u32`/`u64` fields (frame
/// counts, iteration counts) already can't go negative at the type level —
/// a negative value in the file fails deserialization above — so this only
/// needs to cover signed/float fields and cross-field relationships.
fn validate(config: &AppConfig) -> Result<(), PipelineError> {
    let d = &config.detection;
    if d.min_contour_area < 0.0 {
        return Err(PipelineError::Config(format!(
            "detection.min_contour_area must be >= 0, got {}",
            d.min_contour_area
        )));
    }
    if d.max_contour_area < 0.0 {
        return Err(PipelineError::Config(format!(
            "detection.max_contour_area must be >= 0, got {}",
            d.max_contour_area
        )));
    }
    if d.min_contour_area > d.max_contour_area {
        return Err(PipelineError::Config(format!(
            "detection.min_contour_area ({}) must be <= max_contour_area ({})",
            d.min_contour_area, d.max_contour_area
        )));
    }
    if d.blur_kernel_size <= 0 || d.blur_kernel_size % 2 == 0 {
        return Err(PipelineError::Config(format!(
            "detection.blur_kernel_size must be a positive odd integer, got {}",
            d.blur_kernel_size
        )));
    }
    if d.morph_kernel_size <= 0 {
        return Err(PipelineError::Config(format!(
            "detection.morph_kernel_size must be > 0, got {}",
            d.morph_kernel_size
        )));
    }
    if d.morph_iterations <= 0 {
        return Err(PipelineError::Config(format!(
            "detection.morph_iterations must be > 0, got {}",
            d.morph_iterations
        )));
    }
    if d.mog2_history <= 0 {
        return Err(PipelineError::Config(format!(
            "detection.mog2_history must be > 0, got {}",
            d.mog2_history
        )));
    }
    if d.mog2_var_threshold <= 0.0 {
        return Err(PipelineError::Config(format!(
            "detection.mog2_var_threshold must be > 0, got {}",
            d.mog2_var_threshold
        )));
    }

    if config.tracking.max_distance <= 0.0 {
        return Err(PipelineError::Config(format!(
            "tracking.max_distance must be > 0, got {}",
            config.tracking.max_distance
        )));
    }

    if config.temporal_filter.min_move_distance < 0.0 {
        return Err(PipelineError::Config(format!(
            "temporal_filter.min_move_distance must be >= 0, got {}",
            config.temporal_filter.min_move_distance
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let detection = DetectionConfig::default();
        assert_eq!(detection.min_contour_area, 2000.0);
        assert_eq!(detection.mog2_var_threshold, 16.0);

        let tracking = TrackingConfig::default();
        assert_eq!(tracking.max_disappeared, 30);

        let temporal = TemporalFilterConfig::default();
        assert!(!temporal.enabled);
        assert_eq!(temporal.min_confirm_frames, 15);
        assert_eq!(temporal.min_move_distance, 50.0);

        let spatial = SpatialFilterConfig::default();
        assert!(!spatial.enabled);
        assert_eq!(spatial.horizon_line_percent, 0.70);
    }

    fn valid_config() -> AppConfig {
        AppConfig {
            detection: DetectionConfig::default(),
            tracking: TrackingConfig::default(),
            temporal_filter: TemporalFilterConfig::default(),
            spatial_filter: SpatialFilterConfig::default(),
            output: OutputConfig::default(),
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn validate_rejects_negative_max_distance() {
        let mut config = valid_config();
        config.tracking.max_distance = -1.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn validate_rejects_inverted_area_bounds() {
        let mut config = valid_config();
        config.detection.min_contour_area = 500.0;
        config.detection.max_contour_area = 100.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn validate_rejects_even_blur_kernel_size() {
        let mut config = valid_config();
        config.detection.blur_kernel_size = 4;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn validate_rejects_negative_min_move_distance() {
        let mut config = valid_config();
        config.temporal_filter.min_move_distance = -10.0;
        assert!(validate(&config).is_err());
    }
}
