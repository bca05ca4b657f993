//! Output directory management and JSON artifact writing.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;

/// Writes run artifacts into a single output directory.
///
/// Creates the directory on construction if it does not exist.
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display()))]
    pub fn new(output_dir: &Path) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Return the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Resolve `file_name` inside the output directory. Writes nothing.
    #[must_use]
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    /// Serialize `value` as pretty JSON to `{output_dir}/{file_name}`.
    ///
    /// Returns the written path.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeJson`] | `value` cannot be represented as JSON |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip(self, value))]
    pub fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf, IoError> {
        let path = self.path(file_name);
        let json = serde_json::to_string_pretty(value).map_err(|e| IoError::SerializeJson {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), "result written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[derive(Serialize)]
    struct Summary<'a> {
        accuracy: f64,
        classes: Vec<&'a str>,
    }

    #[test]
    fn write_json_structure() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path()).unwrap();
        let summary = Summary {
            accuracy: 0.81,
            classes: vec!["0", "1"],
        };
        let path = writer.write_json("report.json", &summary).unwrap();
        assert_eq!(path, dir.path().join("report.json"));

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!((content["accuracy"].as_f64().unwrap() - 0.81).abs() < 1e-12);
        assert_eq!(content["classes"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("output").join("run");
        let writer = ResultWriter::new(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(writer.path("shap_bar.svg"), nested.join("shap_bar.svg"));
    }

    #[test]
    fn non_string_map_keys_fail_to_serialize() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path()).unwrap();
        let mut bad: BTreeMap<(u8, u8), u8> = BTreeMap::new();
        bad.insert((1, 2), 3);
        let err = writer.write_json("bad.json", &bad).unwrap_err();
        assert!(matches!(err, IoError::SerializeJson { .. }));
    }

    #[test]
    fn output_dir_over_file_fails() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("occupied");
        fs::write(&file, "x").unwrap();
        let err = ResultWriter::new(&file.join("sub")).err().unwrap();
        assert!(matches!(err, IoError::OutputDirCreate { .. }));
    }
}
