//! Trial descriptors and job enumeration
//!
//! A trial is one planner execution against one (scene, folder, seed)
//! combination for one variant. Enumeration produces the full cross product
//! in a deterministic order: scenes as configured, folders lexicographic,
//! then seeds, then variants.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::{BatchConfig, SceneConfig, SceneKind, VariantConfig};
use crate::error::{Error, Result};

/// Fixed member file names inside each configuration folder
pub const ROBOT_FILE: &str = "robot_path.json";
/// Object list file name
pub const OBJECT_FILE: &str = "obj_path.json";
/// Scene-geometry file name
pub const SCENE_FILE: &str = "scene.g";
/// Obstacles file name
pub const OBSTACLE_FILE: &str = "obstacles_file.json";

/// Input files for one trial
///
/// Robot and object paths are always present; the variants carry exactly the
/// optional files the scene provides, so a missing file can never be
/// represented by a placeholder value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialInputs {
    /// Robot and object paths only
    RobotsObjects {
        /// Robot definition file
        robots: PathBuf,
        /// Object list file
        objects: PathBuf,
    },
    /// Robots, objects, and a scene-geometry file
    WithScene {
        /// Robot definition file
        robots: PathBuf,
        /// Object list file
        objects: PathBuf,
        /// Scene-geometry file
        scene: PathBuf,
    },
    /// Robots, objects, and an obstacles file
    WithObstacles {
        /// Robot definition file
        robots: PathBuf,
        /// Object list file
        objects: PathBuf,
        /// Obstacles file
        obstacles: PathBuf,
    },
    /// All four input files
    Full {
        /// Robot definition file
        robots: PathBuf,
        /// Object list file
        objects: PathBuf,
        /// Scene-geometry file
        scene: PathBuf,
        /// Obstacles file
        obstacles: PathBuf,
    },
}

impl TrialInputs {
    /// Robot definition file
    pub fn robots(&self) -> &Path {
        match self {
            TrialInputs::RobotsObjects { robots, .. }
            | TrialInputs::WithScene { robots, .. }
            | TrialInputs::WithObstacles { robots, .. }
            | TrialInputs::Full { robots, .. } => robots,
        }
    }

    /// Object list file
    pub fn objects(&self) -> &Path {
        match self {
            TrialInputs::RobotsObjects { objects, .. }
            | TrialInputs::WithScene { objects, .. }
            | TrialInputs::WithObstacles { objects, .. }
            | TrialInputs::Full { objects, .. } => objects,
        }
    }

    /// Scene-geometry file, if this scene provides one
    pub fn scene(&self) -> Option<&Path> {
        match self {
            TrialInputs::WithScene { scene, .. } | TrialInputs::Full { scene, .. } => {
                Some(scene)
            }
            _ => None,
        }
    }

    /// Obstacles file, if this scene provides one
    pub fn obstacles(&self) -> Option<&Path> {
        match self {
            TrialInputs::WithObstacles { obstacles, .. }
            | TrialInputs::Full { obstacles, .. } => Some(obstacles),
            _ => None,
        }
    }

    /// Resolve the input files a folder must provide for the given scene kind
    ///
    /// Every resolved file is checked for existence; a missing file is a
    /// configuration error.
    pub fn for_folder(kind: SceneKind, folder_dir: &Path) -> Result<Self> {
        let robots = required_file(folder_dir, ROBOT_FILE)?;
        let objects = required_file(folder_dir, OBJECT_FILE)?;
        Ok(match kind {
            SceneKind::RobotsObjects => TrialInputs::RobotsObjects { robots, objects },
            SceneKind::WithScene => TrialInputs::WithScene {
                robots,
                objects,
                scene: required_file(folder_dir, SCENE_FILE)?,
            },
            SceneKind::WithObstacles => TrialInputs::WithObstacles {
                robots,
                objects,
                obstacles: required_file(folder_dir, OBSTACLE_FILE)?,
            },
            SceneKind::Full => TrialInputs::Full {
                robots,
                objects,
                scene: required_file(folder_dir, SCENE_FILE)?,
                obstacles: required_file(folder_dir, OBSTACLE_FILE)?,
            },
        })
    }
}

fn required_file(folder_dir: &Path, name: &str) -> Result<PathBuf> {
    let path = folder_dir.join(name);
    if !path.is_file() {
        return Err(Error::config(format!(
            "required input file not found: {}",
            path.display()
        )));
    }
    Ok(path)
}

/// Immutable description of one unit of work
///
/// Identity is (scene, variant, folder, seed); the enumerator never produces
/// two descriptors with the same identity, which is what lets the namespace
/// allocator enforce disjoint output subtrees structurally.
#[derive(Debug, Clone)]
pub struct TrialDescriptor {
    /// Scene name
    pub scene: String,
    /// Configuration folder name within the scene
    pub folder: String,
    /// Random seed passed to the planner
    pub seed: u64,
    /// Planner variant to invoke
    pub variant: VariantConfig,
    /// Input files for this trial
    pub inputs: TrialInputs,
}

impl TrialDescriptor {
    /// Batch-unique identity string, `scene/variant/folder/seed`
    pub fn id(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.scene, self.variant.tag, self.folder, self.seed
        )
    }
}

/// Enumerate the full trial batch from a validated configuration
pub fn enumerate_trials(config: &BatchConfig) -> Result<Vec<TrialDescriptor>> {
    let mut trials = Vec::new();
    for scene in &config.scenes {
        let folders = scene_folders(scene)?;
        for folder in &folders {
            let folder_dir = scene.input_dir.join(folder);
            let inputs = TrialInputs::for_folder(scene.kind, &folder_dir)?;
            for &seed in &scene.seeds {
                for variant in &scene.variants {
                    trials.push(TrialDescriptor {
                        scene: scene.name.clone(),
                        folder: folder.clone(),
                        seed,
                        variant: variant.clone(),
                        inputs: inputs.clone(),
                    });
                }
            }
        }
    }
    Ok(trials)
}

fn scene_folders(scene: &SceneConfig) -> Result<Vec<String>> {
    match &scene.folders {
        Some(declared) => {
            for folder in declared {
                if !scene.input_dir.join(folder).is_dir() {
                    return Err(Error::config(format!(
                        "scene '{}': declared folder '{}' not found under {}",
                        scene.name,
                        folder,
                        scene.input_dir.display()
                    )));
                }
            }
            Ok(declared.clone())
        }
        None => discover_folders(scene),
    }
}

fn discover_folders(scene: &SceneConfig) -> Result<Vec<String>> {
    let entries =
        fs::read_dir(&scene.input_dir).map_err(|e| Error::io(&scene.input_dir, e))?;
    let mut folders = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(&scene.input_dir, e))?;
        let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
        if file_type.is_dir() {
            folders.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    if folders.is_empty() {
        return Err(Error::config(format!(
            "scene '{}': no configuration folders under {}",
            scene.name,
            scene.input_dir.display()
        )));
    }
    // native listing order is platform-defined
    folders.sort();
    Ok(folders)
}

/// Number of objects declared in a folder's object list file
///
/// Advisory metadata for the batch report; lets downstream analysis bucket
/// trials by instance size.
pub fn object_count(objects_path: &Path) -> Result<usize> {
    let raw = fs::read_to_string(objects_path).map_err(|e| Error::io(objects_path, e))?;
    let doc: Value = serde_json::from_str(&raw).map_err(|e| Error::json(objects_path, e))?;
    Ok(doc
        .get("objects")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchConfig;
    use std::fs::File;
    use std::io::Write;

    fn write_file(path: &Path, contents: &str) {
        let mut file = File::create(path).unwrap();
        write!(file, "{contents}").unwrap();
    }

    fn make_folder(input_dir: &Path, name: &str, files: &[&str]) {
        let dir = input_dir.join(name);
        fs::create_dir_all(&dir).unwrap();
        for file in files {
            write_file(&dir.join(file), "{}");
        }
    }

    fn scene(input_dir: &Path, kind: SceneKind) -> SceneConfig {
        SceneConfig {
            name: "random".to_string(),
            input_dir: input_dir.to_path_buf(),
            kind,
            folders: None,
            seeds: vec![879, 880],
            variants: vec![
                VariantConfig {
                    tag: "sipp".to_string(),
                    program: PathBuf::from("./sipp.exe"),
                },
                VariantConfig {
                    tag: "rrt".to_string(),
                    program: PathBuf::from("./rrt.exe"),
                },
            ],
        }
    }

    fn config(scenes: Vec<SceneConfig>) -> BatchConfig {
        BatchConfig {
            log_root: PathBuf::from("log"),
            result_root: PathBuf::from("result"),
            workers: 4,
            trial_timeout_secs: None,
            scenes,
        }
    }

    #[test]
    fn test_enumeration_cross_product() {
        let dir = tempfile::tempdir().unwrap();
        make_folder(dir.path(), "f1", &[ROBOT_FILE, OBJECT_FILE]);
        make_folder(dir.path(), "f0", &[ROBOT_FILE, OBJECT_FILE]);

        let trials =
            enumerate_trials(&config(vec![scene(dir.path(), SceneKind::RobotsObjects)]))
                .unwrap();

        // 2 folders x 2 seeds x 2 variants
        assert_eq!(trials.len(), 8);
        // folders are visited in lexicographic order regardless of creation order
        assert_eq!(trials[0].id(), "random/sipp/f0/879");
        assert_eq!(trials[1].id(), "random/rrt/f0/879");
        assert_eq!(trials[2].id(), "random/sipp/f0/880");
        assert_eq!(trials[4].id(), "random/sipp/f1/879");
    }

    #[test]
    fn test_enumeration_unique_identities() {
        let dir = tempfile::tempdir().unwrap();
        make_folder(dir.path(), "f0", &[ROBOT_FILE, OBJECT_FILE]);
        make_folder(dir.path(), "f1", &[ROBOT_FILE, OBJECT_FILE]);

        let trials =
            enumerate_trials(&config(vec![scene(dir.path(), SceneKind::RobotsObjects)]))
                .unwrap();
        let ids: std::collections::HashSet<String> = trials.iter().map(|t| t.id()).collect();
        assert_eq!(ids.len(), trials.len());
    }

    #[test]
    fn test_inputs_match_scene_kind() {
        let dir = tempfile::tempdir().unwrap();
        make_folder(
            dir.path(),
            "f0",
            &[ROBOT_FILE, OBJECT_FILE, SCENE_FILE, OBSTACLE_FILE],
        );

        let inputs =
            TrialInputs::for_folder(SceneKind::RobotsObjects, &dir.path().join("f0")).unwrap();
        assert!(inputs.scene().is_none());
        assert!(inputs.obstacles().is_none());

        let inputs = TrialInputs::for_folder(SceneKind::WithScene, &dir.path().join("f0")).unwrap();
        assert!(inputs.scene().is_some());
        assert!(inputs.obstacles().is_none());

        let inputs = TrialInputs::for_folder(SceneKind::Full, &dir.path().join("f0")).unwrap();
        assert!(inputs.scene().is_some());
        assert!(inputs.obstacles().is_some());
    }

    #[test]
    fn test_missing_required_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        make_folder(dir.path(), "f0", &[ROBOT_FILE, OBJECT_FILE]);

        let result = enumerate_trials(&config(vec![scene(dir.path(), SceneKind::Full)]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_declared_folder_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        make_folder(dir.path(), "f0", &[ROBOT_FILE, OBJECT_FILE]);

        let mut sc = scene(dir.path(), SceneKind::RobotsObjects);
        sc.folders = Some(vec!["f0".to_string(), "ghost".to_string()]);
        let result = enumerate_trials(&config(vec![sc]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_scene_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = enumerate_trials(&config(vec![scene(dir.path(), SceneKind::RobotsObjects)]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_object_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(OBJECT_FILE);
        write_file(&path, r#"{"objects": [{"id": 1}, {"id": 2}, {"id": 3}]}"#);
        assert_eq!(object_count(&path).unwrap(), 3);

        write_file(&path, r#"{"robots": []}"#);
        assert_eq!(object_count(&path).unwrap(), 0);
    }
}
