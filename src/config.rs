//! JSON runtime configuration for the CLI tools.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ScanError;
use crate::pipeline::PipelineParams;

/// Configuration for the `scan` finalize tool.
#[derive(Clone, Debug, Deserialize)]
pub struct RuntimeConfig {
    /// Intermediate detections log produced by a prior scan.
    pub detections_csv: PathBuf,
    /// Directory receiving one final report per raster.
    pub output_dir: PathBuf,
    #[serde(default)]
    pub params: PipelineParams,
    /// Geotransform applied to rasters opened from plain image files, which
    /// carry no georeferencing of their own. `None` leaves the identity
    /// transform in place.
    #[serde(default)]
    pub geotransform: Option<[f64; 6]>,
}

pub fn load_config(path: &Path) -> Result<RuntimeConfig, ScanError> {
    let contents = fs::read_to_string(path).map_err(|e| ScanError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let config: RuntimeConfig =
        serde_json::from_str(&contents).map_err(|e| ScanError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    config.params.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"detections_csv": "scan.csv", "output_dir": "out"}"#,
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.params.window_size, 1024);
        assert_eq!(config.params.stride, 512);
        assert_eq!(config.params.classes.len(), 3);
        assert!(config.geotransform.is_none());
    }

    #[test]
    fn misconfigured_thresholds_are_rejected_at_load_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "detections_csv": "scan.csv",
                "output_dir": "out",
                "params": {"score_threshold": 7.0}
            }"#,
        )
        .unwrap();
        assert!(matches!(
            load_config(&path),
            Err(ScanError::InvalidParams(_))
        ));
    }
}
