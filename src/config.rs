//! Batch configuration types
//!
//! A batch is described by a JSON file naming the output roots, the worker
//! pool size, and the scenes to sweep. Each scene declares its input
//! directory, which input files its folders provide (`kind`), the seeds to
//! run, and the planner variants competing on it.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which input files each configuration folder of a scene provides
///
/// Every folder carries a robot file and an object file; some scenes add a
/// scene-geometry file, an obstacles file, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// Robot and object paths only
    RobotsObjects,
    /// Robots, objects, and a scene-geometry file
    WithScene,
    /// Robots, objects, and an obstacles file
    WithObstacles,
    /// All four input files
    Full,
}

/// One competing planner variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Short tag naming the variant in output paths (e.g. "sipp", "rrt")
    pub tag: String,
    /// Planner executable invoked for this variant
    pub program: PathBuf,
}

/// One scene to sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Scene name, used in output paths
    pub name: String,
    /// Directory holding one subdirectory per configuration folder
    pub input_dir: PathBuf,
    /// Input-file shape of this scene's folders
    pub kind: SceneKind,
    /// Explicit folder list; `None` discovers subdirectories of `input_dir`
    #[serde(default)]
    pub folders: Option<Vec<String>>,
    /// Random seeds to run per folder
    pub seeds: Vec<u64>,
    /// Planner variants active for this scene
    pub variants: Vec<VariantConfig>,
}

/// Top-level batch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Root for raw per-trial planner logs
    #[serde(default = "default_log_root")]
    pub log_root: PathBuf,

    /// Root for aggregated per-scene results
    #[serde(default = "default_result_root")]
    pub result_root: PathBuf,

    /// Worker pool size (concurrent planner processes)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-trial wall-clock timeout in seconds; hung planners are killed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_timeout_secs: Option<u64>,

    /// Scenes to sweep
    pub scenes: Vec<SceneConfig>,
}

fn default_log_root() -> PathBuf {
    PathBuf::from("log")
}

fn default_result_root() -> PathBuf {
    PathBuf::from("result")
}

fn default_workers() -> usize {
    1
}

impl BatchConfig {
    /// Load and validate a batch configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: BatchConfig = serde_json::from_str(&raw).map_err(|e| Error::json(path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::config("workers must be at least 1"));
        }
        if self.scenes.is_empty() {
            return Err(Error::config("at least one scene must be configured"));
        }
        for scene in &self.scenes {
            if scene.name.is_empty() {
                return Err(Error::config("scene name must not be empty"));
            }
            if scene.seeds.is_empty() {
                return Err(Error::config(format!(
                    "scene '{}' declares no seeds",
                    scene.name
                )));
            }
            if scene.variants.is_empty() {
                return Err(Error::config(format!(
                    "scene '{}' declares no planner variants",
                    scene.name
                )));
            }
            let mut tags = HashSet::new();
            for variant in &scene.variants {
                if !tags.insert(variant.tag.as_str()) {
                    return Err(Error::config(format!(
                        "scene '{}' declares variant tag '{}' more than once",
                        scene.name, variant.tag
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal_scene() -> SceneConfig {
        SceneConfig {
            name: "random".to_string(),
            input_dir: PathBuf::from("in/random"),
            kind: SceneKind::RobotsObjects,
            folders: None,
            seeds: vec![879],
            variants: vec![VariantConfig {
                tag: "sipp".to_string(),
                program: PathBuf::from("./sipp.exe"),
            }],
        }
    }

    fn minimal_config() -> BatchConfig {
        BatchConfig {
            log_root: default_log_root(),
            result_root: default_result_root(),
            workers: 4,
            trial_timeout_secs: None,
            scenes: vec![minimal_scene()],
        }
    }

    #[test]
    fn test_validation_valid() {
        assert!(minimal_config().validate().is_ok());
    }

    #[test]
    fn test_validation_zero_workers() {
        let mut config = minimal_config();
        config.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_no_scenes() {
        let mut config = minimal_config();
        config.scenes.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_no_seeds() {
        let mut config = minimal_config();
        config.scenes[0].seeds.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_no_variants() {
        let mut config = minimal_config();
        config.scenes[0].variants.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_duplicate_variant_tags() {
        let mut config = minimal_config();
        let dup = config.scenes[0].variants[0].clone();
        config.scenes[0].variants.push(dup);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sipp"));
    }

    #[test]
    fn test_scene_kind_snake_case() {
        assert_eq!(
            serde_json::to_string(&SceneKind::RobotsObjects).unwrap(),
            "\"robots_objects\""
        );
        assert_eq!(
            serde_json::to_string(&SceneKind::WithObstacles).unwrap(),
            "\"with_obstacles\""
        );
    }

    #[test]
    fn test_config_roundtrip() {
        let config = minimal_config();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: BatchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.workers, 4);
        assert_eq!(deserialized.scenes[0].kind, SceneKind::RobotsObjects);
    }

    #[test]
    fn test_load_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"scenes": [{{"name": "shelf", "input_dir": "in/shelf",
                "kind": "full", "seeds": [1], "variants":
                [{{"tag": "rrt", "program": "./rrt.exe"}}]}}]}}"#
        )
        .unwrap();

        let config = BatchConfig::load(&path).unwrap();
        assert_eq!(config.workers, 1);
        assert_eq!(config.log_root, PathBuf::from("log"));
        assert_eq!(config.result_root, PathBuf::from("result"));
        assert!(config.trial_timeout_secs.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = BatchConfig::load(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
