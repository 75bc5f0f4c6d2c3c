use facemark_core::ScoreWeights;
use std::path::PathBuf;

/// Runtime configuration, loaded from environment variables.
pub struct Config {
    /// Directory holding the JSON data files.
    pub data_dir: PathBuf,
    /// Path to the enrollment records file.
    pub enrollments_path: PathBuf,
    /// Path to the attendance ledger file.
    pub attendance_path: PathBuf,
    /// Minimum combined score to accept a match.
    pub tolerance: f32,
    /// Score-fusion weights.
    pub weights: ScoreWeights,
}

impl Config {
    /// Load configuration from `FACEMARK_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("FACEMARK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                std::env::var("XDG_DATA_HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| {
                        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                        PathBuf::from(home).join(".local/share")
                    })
                    .join("facemark")
            });

        let enrollments_path = std::env::var("FACEMARK_ENROLLMENTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("enrollments.json"));

        let attendance_path = std::env::var("FACEMARK_ATTENDANCE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("attendance.json"));

        let defaults = ScoreWeights::default();
        Self {
            data_dir,
            enrollments_path,
            attendance_path,
            tolerance: env_f32("FACEMARK_TOLERANCE", 0.85),
            weights: ScoreWeights {
                phash: env_f32("FACEMARK_WEIGHT_PHASH", defaults.phash),
                region: env_f32("FACEMARK_WEIGHT_REGION", defaults.region),
                exact_boost: env_f32("FACEMARK_WEIGHT_EXACT_BOOST", defaults.exact_boost),
            },
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
