//! # Input Documents
//!
//! Loads calibration cores, readings, and fitted models from JSON or YAML.
//! The format is chosen by file extension: `.json`, `.yaml`, or `.yml`.
//!
//! Cores and readings may be given as a bare list or wrapped with shared
//! fields:
//!
//! ```yaml
//! project_id: 6f1c...   # optional
//! points:
//!   - { upv: 4000, rebound_index: 30, core_fc: 25.0 }
//!   - { upv: 4100, rh_index: 31, carbonation_depth: 6, core_fc: 26.0 }
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use sonreb_calibration::CalibrationModel;
use sonreb_core::{CalibrationPoint, MemberId, PointId, ProjectId, Reading};

/// Parse `path` as JSON or YAML according to its extension.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON in {}", path.display())),
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML in {}", path.display())),
        _ => bail!(
            "unsupported input format for {}: expected .json, .yaml, or .yml",
            path.display()
        ),
    }
}

/// One core as written in an input file.
#[derive(Debug, Deserialize)]
pub struct CoreRecord {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub member_id: Option<Uuid>,
    pub upv: f64,
    #[serde(alias = "rh_index")]
    pub rebound_index: f64,
    #[serde(default)]
    pub carbonation_depth: Option<f64>,
    pub core_fc: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CoresDocument {
    Wrapped {
        #[serde(default)]
        project_id: Option<Uuid>,
        points: Vec<CoreRecord>,
    },
    Bare(Vec<CoreRecord>),
}

/// Load calibration cores.
///
/// All cores share one project: the file's `project_id` when present,
/// otherwise `fallback`, otherwise a fresh identifier.
pub fn load_cores(path: &Path, fallback: Option<ProjectId>) -> Result<Vec<CalibrationPoint>> {
    let (file_project, records) = match read_document::<CoresDocument>(path)? {
        CoresDocument::Wrapped { project_id, points } => (project_id, points),
        CoresDocument::Bare(points) => (None, points),
    };
    let project_id = file_project
        .map(ProjectId::from_uuid)
        .or(fallback)
        .unwrap_or_default();

    let points: Vec<CalibrationPoint> = records
        .into_iter()
        .map(|r| {
            let mut point = CalibrationPoint::new(project_id, r.upv, r.rebound_index, r.core_fc);
            if let Some(id) = r.id {
                point = point.with_id(PointId::from_uuid(id));
            }
            if let Some(member) = r.member_id {
                point = point.with_member(MemberId::from_uuid(member));
            }
            point.carbonation_depth = r.carbonation_depth;
            point.notes = r.notes.unwrap_or_default();
            point
        })
        .collect();

    tracing::debug!(path = %path.display(), count = points.len(), %project_id, "loaded cores");
    Ok(points)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReadingsDocument {
    Wrapped {
        #[serde(default)]
        design_fc: Option<f64>,
        readings: Vec<Reading>,
    },
    Bare(Vec<Reading>),
}

/// Load field readings.
///
/// Readings without their own `design_fc` take `design_fc` from the
/// command line, else the file-level value.
pub fn load_readings(path: &Path, design_fc: Option<f64>) -> Result<Vec<Reading>> {
    let (file_design, mut readings) = match read_document::<ReadingsDocument>(path)? {
        ReadingsDocument::Wrapped {
            design_fc,
            readings,
        } => (design_fc, readings),
        ReadingsDocument::Bare(readings) => (None, readings),
    };
    if let Some(default) = design_fc.or(file_design) {
        for reading in readings.iter_mut().filter(|r| r.design_fc.is_none()) {
            reading.design_fc = Some(default);
        }
    }
    tracing::debug!(path = %path.display(), count = readings.len(), "loaded readings");
    Ok(readings)
}

/// Load a fitted model, as written by `sonreb fit`.
///
/// The record is validated so an edited file cannot silently drop the
/// carbonation term or its range.
pub fn load_model(path: &Path) -> Result<CalibrationModel> {
    let model: CalibrationModel = read_document(path)?;
    model
        .validate()
        .with_context(|| format!("inconsistent model in {}", path.display()))?;
    tracing::debug!(model_id = %model.id, project_id = %model.project_id, "loaded model");
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn bare_json_cores_share_a_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "cores.json",
            r#"[{"upv": 4000, "rebound_index": 30, "core_fc": 25},
                {"upv": 4100, "rh_index": 31, "carbonation_depth": 6, "core_fc": 26}]"#,
        );
        let points = load_cores(&path, None).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].project_id, points[1].project_id);
        assert_eq!(points[1].rebound_index, 31.0);
        assert_eq!(points[1].carbonation_depth, Some(6.0));
    }

    #[test]
    fn wrapped_yaml_cores_keep_file_project() {
        let dir = tempfile::tempdir().unwrap();
        let project = Uuid::new_v4();
        let path = write_temp(
            &dir,
            "cores.yml",
            &format!(
                "project_id: {project}\npoints:\n  - {{ upv: 4000, rebound_index: 30, core_fc: 25, notes: north face }}\n"
            ),
        );
        let points = load_cores(&path, Some(ProjectId::new())).unwrap();
        assert_eq!(points[0].project_id, ProjectId::from_uuid(project));
        assert_eq!(points[0].notes, "north face");
    }

    #[test]
    fn readings_take_design_strength_from_flag_then_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "readings.yaml",
            "design_fc: 30\nreadings:\n  - { upv: 4000, rebound_index: 30 }\n  - { upv: 4100, rebound_index: 31, design_fc: 25 }\n",
        );
        let from_file = load_readings(&path, None).unwrap();
        assert_eq!(from_file[0].design_fc, Some(30.0));
        assert_eq!(from_file[1].design_fc, Some(25.0));

        let from_flag = load_readings(&path, Some(28.0)).unwrap();
        assert_eq!(from_flag[0].design_fc, Some(28.0));
        assert_eq!(from_flag[1].design_fc, Some(25.0));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "cores.csv", "upv,rh,fc\n");
        let err = load_cores(&path, None).unwrap_err();
        assert!(format!("{err:#}").contains("unsupported input format"));
    }

    #[test]
    fn malformed_json_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "cores.json", "[{\"upv\": }]");
        let err = load_cores(&path, None).unwrap_err();
        assert!(format!("{err:#}").contains("cores.json"));
    }

    const CARBONATION_MODEL: &str = r#"{
        "id": "6f1c2b1e-3d4a-4b5c-8d6e-7f8091a2b3c4",
        "project_id": "0a1b2c3d-4e5f-4a6b-8c7d-9e0f1a2b3c4d",
        "a0": 1.0e-9, "a1": 1.2, "a2": 2.2, "a3": -0.1,
        "r2": 0.9, "rmse": 1.5, "points_used": 8, "use_carbonation": true,
        "upv_min": 3800, "upv_max": 4400, "rh_min": 28, "rh_max": 38,
        "carbonation_min": 4, "carbonation_max": 15,
        "created_at": "2026-01-05T10:00:00Z"
    }"#;

    #[test]
    fn consistent_model_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "model.json", CARBONATION_MODEL);
        let model = load_model(&path).unwrap();
        assert!(model.use_carbonation);
        assert_eq!(model.a3, Some(-0.1));
    }

    #[test]
    fn carbonation_model_without_exponent_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let edited = CARBONATION_MODEL
            .replace(r#""a3": -0.1,"#, "")
            .replace(r#""carbonation_min": 4, "carbonation_max": 15,"#, "");
        let path = write_temp(&dir, "model.json", &edited);
        let err = load_model(&path).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("inconsistent model"), "{message}");
        assert!(message.contains("a3"), "{message}");
    }
}
