//! Engine configuration: defaults, then a JSON file, then `ADCRAFT_*` env.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::model::Angle;
use crate::validation::ZonePolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Root directory for the `originals` and `generated` buckets.
    pub storage_root: PathBuf,
    /// Where the CLI keeps its store snapshot between runs.
    pub state_file: PathBuf,
    /// Directories scanned for `.ttf`/`.otf`/`.ttc` faces on top of the
    /// system fonts. Theme faces (Inter, Bebas Neue, Playfair Display) go here.
    pub font_dirs: Vec<PathBuf>,
    /// Fixed RNG seed; random from entropy when absent.
    pub seed: Option<u64>,
    pub zone_policy: ZonePolicy,
    pub angle_rotation: Vec<Angle>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("storage"),
            state_file: PathBuf::from("storage/state.json"),
            font_dirs: vec![PathBuf::from("fonts")],
            seed: None,
            zone_policy: ZonePolicy::Clamp,
            angle_rotation: Angle::ROTATION.to_vec(),
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Configuration(format!("cannot read config {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            EngineError::Configuration(format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// Load configuration from environment variables over `self`.
    ///
    /// | Env Var                  | Meaning                          |
    /// |--------------------------|----------------------------------|
    /// | `ADCRAFT_STORAGE_ROOT`   | bucket root directory            |
    /// | `ADCRAFT_STATE_FILE`     | store snapshot path              |
    /// | `ADCRAFT_FONT_DIRS`      | font directories, path-separated |
    /// | `ADCRAFT_SEED`           | u64 RNG seed                     |
    /// | `ADCRAFT_ZONE_POLICY`    | `clamp` or `reject`              |
    /// | `ADCRAFT_ANGLE_ROTATION` | comma-separated angles           |
    pub fn with_env(self) -> EngineResult<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> EngineResult<Self> {
        if let Some(root) = var("ADCRAFT_STORAGE_ROOT") {
            self.storage_root = PathBuf::from(root);
        }
        if let Some(state) = var("ADCRAFT_STATE_FILE") {
            self.state_file = PathBuf::from(state);
        }
        if let Some(dirs) = var("ADCRAFT_FONT_DIRS") {
            self.font_dirs = std::env::split_paths(&dirs).collect();
        }
        if let Some(seed) = var("ADCRAFT_SEED") {
            self.seed = Some(seed.trim().parse().map_err(|_| {
                EngineError::Configuration(format!("ADCRAFT_SEED must be a u64, got '{}'", seed))
            })?);
        }
        if let Some(policy) = var("ADCRAFT_ZONE_POLICY") {
            self.zone_policy = policy.trim().parse()?;
        }
        if let Some(rotation) = var("ADCRAFT_ANGLE_ROTATION") {
            self.angle_rotation = parse_rotation(&rotation)?;
        }
        Ok(self)
    }

    /// Defaults, overlaid by `path` when given, overlaid by the environment.
    pub fn load(path: Option<&Path>) -> EngineResult<Self> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        base.with_env()
    }
}

pub fn parse_rotation(s: &str) -> EngineResult<Vec<Angle>> {
    let angles = s
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|a| a.parse::<Angle>())
        .collect::<EngineResult<Vec<_>>>()
        .map_err(|e| EngineError::Configuration(format!("angle rotation: {}", e)))?;
    if angles.is_empty() {
        return Err(EngineError::Configuration("angle rotation is empty".into()));
    }
    Ok(angles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_defaults() {
        let config = EngineConfig::default()
            .with_vars(vars(&[
                ("ADCRAFT_SEED", "42"),
                ("ADCRAFT_ZONE_POLICY", "reject"),
                ("ADCRAFT_ANGLE_ROTATION", "story, contrast"),
                ("ADCRAFT_STORAGE_ROOT", "/tmp/ads"),
            ]))
            .unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.zone_policy, ZonePolicy::Reject);
        assert_eq!(config.angle_rotation, vec![Angle::Story, Angle::Contrast]);
        assert_eq!(config.storage_root, PathBuf::from("/tmp/ads"));
        assert_eq!(config.state_file, PathBuf::from("storage/state.json"));
    }

    #[test]
    fn test_bad_env_values_are_configuration_errors() {
        for (key, value) in [
            ("ADCRAFT_SEED", "forty-two"),
            ("ADCRAFT_ZONE_POLICY", "stretch"),
            ("ADCRAFT_ANGLE_ROTATION", "benefit,hype"),
            ("ADCRAFT_ANGLE_ROTATION", " , "),
        ] {
            let err = EngineConfig::default().with_vars(vars(&[(key, value)])).unwrap_err();
            assert!(matches!(err, EngineError::Configuration(_)), "{}={}", key, value);
        }
    }

    #[test]
    fn test_partial_json_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adcraft.json");
        std::fs::write(&path, r#"{"seed": 7, "fontDirs": ["assets/fonts"], "zonePolicy": "reject"}"#).unwrap();
        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.font_dirs, vec![PathBuf::from("assets/fonts")]);
        assert_eq!(config.zone_policy, ZonePolicy::Reject);
        assert_eq!(config.angle_rotation, Angle::ROTATION.to_vec());
    }
}
