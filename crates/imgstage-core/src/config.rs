//! Per-stage configuration.

use serde::{Deserialize, Serialize};

use crate::decode::FilterType;
use crate::transform::InterpolationFilter;

/// Default permission bits applied to saved files.
pub const DEFAULT_FILE_MODE: u32 = 0o755;

/// How construction failures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorReporting {
    /// Log at error level.
    #[default]
    Report,
    /// Log at debug level only.
    Silent,
}

/// Settings carried by each [`StageImage`](crate::StageImage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub on_error: ErrorReporting,
    /// Unix permission bits set on files after saving.
    pub file_mode: u32,
    /// Resampling filter for resizes.
    pub filter: FilterType,
    /// Interpolation for rotations that are not quarter turns.
    pub rotation_filter: InterpolationFilter,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            on_error: ErrorReporting::Report,
            file_mode: DEFAULT_FILE_MODE,
            filter: FilterType::Bilinear,
            rotation_filter: InterpolationFilter::Bilinear,
        }
    }
}

impl StageConfig {
    pub fn silent(mut self) -> Self {
        self.on_error = ErrorReporting::Silent;
        self
    }

    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_rotation_filter(mut self, filter: InterpolationFilter) -> Self {
        self.rotation_filter = filter;
        self
    }
}
