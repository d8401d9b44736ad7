use anyhow::anyhow;
use scope_viewer::{Dataset, MemoryBackend};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::task;

/// Viewer settings live next to the datasets under this name.
pub const CONFIG_FILE: &str = "scope.json";

#[derive(Error, Debug)]
pub enum FileError {
    #[error("Invalid directory: {dir:?}")]
    InvalidDirectory { dir: String },
    #[error("No dataset files in {dir:?}")]
    NoDatasets { dir: String },
}

#[derive(PartialEq, Clone)]
pub struct DatasetStub {
    pub name: String,
    pub full_path: PathBuf,
}

/// The dataset files (`*.json`) of one working directory, sorted by name.
#[derive(PartialEq, Clone)]
pub struct DatasetFiles {
    directory: PathBuf,
    file_list: Vec<DatasetStub>,
}

impl DatasetFiles {
    pub fn create(path: &str) -> anyhow::Result<Self> {
        let buf = PathBuf::from(path);
        let all_files = fs::read_dir(&buf).map_err(|_| FileError::InvalidDirectory {
            dir: path.to_string(),
        })?;

        let mut files: Vec<DatasetStub> = all_files
            .map(|entry| {
                let entry = entry?;
                let name = entry.file_name();
                let name_str = name
                    .to_str()
                    .ok_or_else(|| anyhow!("Invalid UTF-8 in filename"))?;
                if name_str.ends_with(".json") && name_str != CONFIG_FILE {
                    Ok(Some(DatasetStub {
                        name: name_str.to_string(),
                        full_path: buf.join(name_str),
                    }))
                } else {
                    Ok(None)
                }
            })
            .collect::<anyhow::Result<Vec<Option<DatasetStub>>>>()?
            .into_iter()
            .flatten()
            .collect();

        if files.is_empty() {
            return Err(FileError::NoDatasets {
                dir: path.to_string(),
            }
            .into());
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(DatasetFiles {
            directory: buf,
            file_list: files,
        })
    }

    /// Reads the working directory from the first non-empty line of
    /// `file_paths.txt`, falling back to the current directory.
    pub fn from_paths_file() -> anyhow::Result<Self> {
        let dir = fs::read_to_string("file_paths.txt")
            .ok()
            .and_then(|content| content.lines().map(str::trim).find(|l| !l.is_empty()).map(String::from))
            .unwrap_or_else(|| ".".to_string());
        Self::create(&dir)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn file_list(&self) -> &[DatasetStub] {
        &self.file_list
    }
}

/// Parses every dataset into an in-process backend keyed by file name.
pub async fn load_backend(files: DatasetFiles) -> anyhow::Result<MemoryBackend> {
    task::spawn_blocking(move || {
        let mut backend = MemoryBackend::new();
        for stub in files.file_list() {
            log::info!("Loading dataset: {}", stub.full_path.display());
            backend.insert(stub.name.clone(), Dataset::load_json(&stub.full_path)?);
        }
        Ok(backend)
    })
    .await?
}
