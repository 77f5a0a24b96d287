//! # File I/O Module
//!
//! Handles project and result files with safety features:
//! - **Atomic saves**: Write to .tmp, sync, rename to prevent corruption
//! - **Version validation**: Ensure schema compatibility on load
//!
//! ## File Format
//!
//! Projects and results are pretty-printed JSON.
//!
//! ## Example
//!
//! ```rust,no_run
//! use section_core::file_io::{load_project, save_project};
//! use section_core::project::Project;
//! use std::path::Path;
//!
//! let project = Project::example();
//! let path = Path::new("beam.json");
//! save_project(&project, path)?;
//! let loaded = load_project(path)?;
//! assert_eq!(loaded.meta.job_id, project.meta.job_id);
//! # Ok::<(), section_core::errors::CalcError>(())
//! ```

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;

use crate::errors::{CalcError, CalcResult};
use crate::project::{Project, SCHEMA_VERSION};

/// Temporary sibling used during atomic writes: `name.ext` → `name.ext.tmp`
fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `contents` to `path` atomically.
///
/// 1. Write to a temporary file (.tmp)
/// 2. Sync to disk (fsync)
/// 3. Rename over the destination (atomic on most filesystems)
fn write_atomic(path: &Path, contents: &[u8]) -> CalcResult<()> {
    let tmp_path = tmp_path_for(path);

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        CalcError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(contents).map_err(|e| {
        CalcError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        CalcError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CalcError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    debug!("wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Save a project with atomic write semantics.
///
/// # Example
///
/// ```rust,no_run
/// use section_core::file_io::save_project;
/// use section_core::project::Project;
/// use std::path::Path;
///
/// let project = Project::new("Engineer", "25-001", "Client");
/// save_project(&project, Path::new("myproject.json"))?;
/// # Ok::<(), section_core::errors::CalcError>(())
/// ```
pub fn save_project(project: &Project, path: &Path) -> CalcResult<()> {
    let json = serde_json::to_string_pretty(project)?;
    write_atomic(path, json.as_bytes())
}

/// Save any serializable analysis output (typically the runs of a project)
/// with the same atomic write as projects.
pub fn save_results<T: Serialize + ?Sized>(results: &T, path: &Path) -> CalcResult<()> {
    let json = serde_json::to_string_pretty(results)?;
    write_atomic(path, json.as_bytes())
}

/// Load a project from a file.
///
/// # Returns
///
/// * `Ok(Project)` - Successfully loaded project
/// * `Err(CalcError::VersionMismatch)` - File version is incompatible
/// * `Err(CalcError::SerializationError)` - Invalid JSON
/// * `Err(CalcError::FileError)` - I/O error
pub fn load_project(path: &Path) -> CalcResult<Project> {
    let mut file = File::open(path).map_err(|e| {
        CalcError::file_error("open", path.display().to_string(), e.to_string())
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|e| {
        CalcError::file_error("read", path.display().to_string(), e.to_string())
    })?;

    // Check the version before the full parse so an incompatible file
    // reports a version error rather than a missing field
    let header: serde_json::Value = serde_json::from_str(&contents).map_err(|e| CalcError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })?;
    let version = header
        .pointer("/meta/version")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CalcError::missing_field("meta.version"))?;
    validate_version(version)?;

    let project: Project = serde_json::from_value(header).map_err(|e| CalcError::SerializationError {
        reason: format!("Invalid project in {}: {}", path.display(), e),
    })?;

    debug!(
        "loaded project {} ({} materials, {} sections, {} items)",
        project.meta.job_id,
        project.materials.len(),
        project.sections.len(),
        project.items.len()
    );
    Ok(project)
}

/// Validate that a file version is compatible with the current schema.
fn validate_version(file_version: &str) -> CalcResult<()> {
    let mismatch = || CalcError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let parse = |v: &str| -> Option<Vec<u32>> { v.split('.').map(|p| p.parse().ok()).collect() };
    let file_parts = parse(file_version).filter(|p| !p.is_empty()).ok_or_else(mismatch)?;
    let current_parts = parse(SCHEMA_VERSION).ok_or_else(mismatch)?;

    // Major version must match
    if file_parts[0] != current_parts[0] {
        return Err(mismatch());
    }

    // For 0.x versions a newer minor version is a breaking change
    if current_parts[0] == 0 && file_parts.len() > 1 && current_parts.len() > 1 && file_parts[1] > current_parts[1] {
        return Err(mismatch());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::{CalculationItem, UltimateInput};
    use crate::progress::Silent;
    use std::env::temp_dir;

    fn temp_path(name: &str) -> PathBuf {
        temp_dir().join(format!("section_core_test_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_tmp_path_generation() {
        let path = Path::new("/path/to/project.json");
        assert_eq!(tmp_path_for(path), Path::new("/path/to/project.json.tmp"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_path("roundtrip");

        let project = Project::example();
        save_project(&project, &path).unwrap();

        let loaded = load_project(&path).unwrap();
        assert_eq!(loaded.meta.engineer, project.meta.engineer);
        assert_eq!(loaded.meta.job_id, project.meta.job_id);
        assert_eq!(loaded.items, project.items);
        assert_eq!(loaded.sections, project.sections);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_atomic_save_creates_no_tmp_file() {
        let path = temp_path("atomic");

        save_project(&Project::new("Test", "TEST", "Client"), &path).unwrap();

        assert!(!tmp_path_for(&path).exists());
        assert!(path.exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_save_results() {
        let path = temp_path("results");
        let mut project = Project::example();
        project.items.retain(|_, item| matches!(item.calculation, CalculationItem::Ultimate(_)));
        project.add_item("B1 300x600", CalculationItem::Ultimate(UltimateInput::new("U2").with_axial_load(1e6)));

        let runs = project.run_all(&Silent);
        save_results(&runs, &path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[0]["output"]["type"], "Ultimate");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_newer_schema() {
        let path = temp_path("newer");
        let mut project = Project::example();
        project.meta.version = "0.9.0".to_string();
        save_project(&project, &path).unwrap();

        assert!(matches!(load_project(&path), Err(CalcError::VersionMismatch { .. })));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_errors() {
        let missing = temp_path("does_not_exist");
        assert!(matches!(load_project(&missing), Err(CalcError::FileError { .. })));

        let path = temp_path("garbage");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_project(&path), Err(CalcError::SerializationError { .. })));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.5").is_ok());
        assert!(validate_version("0.0.9").is_ok());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("abc").is_err());
    }
}
