//! File records: the entries a stage run processes.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::{PipelineError, PipelineResult};

/// How a processed file is named in the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputNaming {
    /// Keep the input file name.
    #[default]
    SameName,
    /// Insert a suffix between stem and extension (`a.txt` -> `a_processed.txt`).
    Suffixed(String),
}

/// A regular file found directly inside a stage's input directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    path: PathBuf,
    name: String,
    stem: String,
    suffix: String,
}

impl FileRecord {
    /// Builds a record from a path; `None` if the path has no file name.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let name = path.file_name()?.to_string_lossy().into_owned();
        let stem = path
            .file_stem()
            .map_or_else(|| name.clone(), |s| s.to_string_lossy().into_owned());
        let suffix = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        Some(Self {
            path,
            name,
            stem,
            suffix,
        })
    }

    /// Full path of the input file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name (stem + suffix).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name without its final extension.
    #[must_use]
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Final extension including the dot, or empty.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Name of the corresponding output file.
    #[must_use]
    pub fn output_name(&self, naming: &OutputNaming) -> String {
        match naming {
            OutputNaming::SameName => self.name.clone(),
            OutputNaming::Suffixed(tag) => format!("{}{}{}", self.stem, tag, self.suffix),
        }
    }
}

/// Lists the regular files directly inside `dir`, sorted by name.
///
/// Subdirectories are skipped and symlinks are followed. A missing
/// directory yields no records rather than an error.
pub fn scan_directory(dir: &Path) -> PipelineResult<Vec<FileRecord>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(PipelineError::io(dir, err)),
    };

    let mut records = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| PipelineError::io(dir, err))?.path();
        let is_file = std::fs::metadata(&path)
            .map_err(|err| PipelineError::io(&path, err))?
            .is_file();
        if !is_file {
            continue;
        }
        if let Some(record) = FileRecord::from_path(path) {
            records.push(record);
        }
    }

    records.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_parts() {
        let record = FileRecord::from_path("/efs/preprocessed/test_doc_1.txt").unwrap();
        assert_eq!(record.name(), "test_doc_1.txt");
        assert_eq!(record.stem(), "test_doc_1");
        assert_eq!(record.suffix(), ".txt");
    }

    #[test]
    fn test_record_without_extension() {
        let record = FileRecord::from_path("/tmp/input/README").unwrap();
        assert_eq!(record.stem(), "README");
        assert_eq!(record.suffix(), "");
        assert_eq!(
            record.output_name(&OutputNaming::Suffixed("_processed".to_string())),
            "README_processed"
        );
    }

    #[test]
    fn test_output_naming() {
        let record = FileRecord::from_path("a/report.tar.gz").unwrap();
        assert_eq!(record.output_name(&OutputNaming::SameName), "report.tar.gz");
        assert_eq!(
            record.output_name(&OutputNaming::Suffixed("_processed".to_string())),
            "report.tar_processed.gz"
        );
    }

    #[test]
    fn test_root_has_no_record() {
        assert!(FileRecord::from_path("/").is_none());
    }

    #[test]
    fn test_scan_directory_skips_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.txt"), "c").unwrap();

        let names: Vec<String> = scan_directory(dir.path())
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[test]
    fn test_scan_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records = scan_directory(&dir.path().join("absent")).unwrap();
        assert!(records.is_empty());
    }
}
