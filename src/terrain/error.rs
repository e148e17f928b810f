use thiserror::Error;

/// Errors raised when terrain generation is configured or called incorrectly
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("invalid height range: min {min}, sea level {sea_level}, max {max}")]
    InvalidHeightRange { min: f32, sea_level: f32, max: f32 },

    #[error("function scale must be positive and finite, got {0}")]
    InvalidFunctionScale(f32),

    #[error("patch scale must be positive and finite, got {0}")]
    InvalidPatchScale(f32),

    #[error("grid must have at least one sample in each direction, got {width}x{height}")]
    EmptyGrid { width: usize, height: usize },

    #[error("smallest step size has not been set")]
    StepSizeNotSet,

    #[error("smallest step size must be positive and finite, got ({x}, {z})")]
    InvalidStepSize { x: f32, z: f32 },

    #[error("slope range must be positive and finite, got {0}")]
    InvalidSlopeRange(f32),

    #[error("invalid fractal parameters: {0}")]
    InvalidFractal(String),

    #[error("buffer too small: need {required}, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },

    #[error("invalid buffer layout: {0}")]
    InvalidLayout(String),

    #[error("distribution must hold {expected} finite samples, got {actual}")]
    InvalidDistribution { expected: usize, actual: usize },

    #[error("cloud border {border} must lie above the cutoff {cutoff}, both within [0, 1]")]
    InvalidCloudRange { cutoff: f32, border: f32 },

    #[error("latitude band has {actual} distributions but {expected} terrain types are defined")]
    DistributionCountMismatch { expected: usize, actual: usize },

    #[error("unsupported terrain configuration: {0}")]
    Unsupported(String),

    #[error("failed to parse terrain config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T, E = TerrainError> = std::result::Result<T, E>;
