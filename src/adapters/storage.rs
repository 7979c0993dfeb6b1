use crate::domain::ports::ArtifactStore;
use crate::utils::error::PersistError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};

pub const ARTIFACT_EXTENSION: &str = "xml";

/// Flat directory of `{name}.xml` files. A file's presence means the job is done.
#[derive(Debug, Clone)]
pub struct LocalConfigStore {
    base_path: PathBuf,
}

/// Bytes written to a hidden temp file next to their final location, not yet
/// visible under the canonical name.
pub struct StagedArtifact {
    file: NamedTempFile,
    destination: PathBuf,
}

impl StagedArtifact {
    pub fn temp_path(&self) -> &Path {
        self.file.path()
    }

    /// Renames the staged file onto its canonical path.
    pub fn commit(self) -> Result<PathBuf, PersistError> {
        let destination = self.destination;
        self.file
            .persist(&destination)
            .map_err(|e| io_error(&destination, e.error))?;
        Ok(destination)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> PersistError {
    PersistError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn check_name(name: &str) -> Result<(), PersistError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(PersistError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

impl LocalConfigStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Opens `base_path`, creating it if absent.
    pub fn create(base_path: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let store = Self::new(base_path);
        fs::create_dir_all(&store.base_path).map_err(|e| io_error(&store.base_path, e))?;
        Ok(store)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.{}", name, ARTIFACT_EXTENSION))
    }

    pub fn stage(&self, name: &str, body: &[u8]) -> Result<StagedArtifact, PersistError> {
        check_name(name)?;

        let mut file = Builder::new()
            .prefix(&format!(".{}.{}.", name, ARTIFACT_EXTENSION))
            .suffix(".part")
            .tempfile_in(&self.base_path)
            .map_err(|e| io_error(&self.base_path, e))?;

        file.write_all(body)
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| io_error(file.path(), e))?;

        Ok(StagedArtifact {
            file,
            destination: self.artifact_path(name),
        })
    }

    pub fn exists_blocking(&self, name: &str) -> bool {
        check_name(name).is_ok() && self.artifact_path(name).is_file()
    }

    pub fn write_blocking(&self, name: &str, body: &[u8]) -> Result<PathBuf, PersistError> {
        self.stage(name, body)?.commit()
    }
}

impl ArtifactStore for LocalConfigStore {
    async fn exists(&self, name: &str) -> bool {
        let path = self.artifact_path(name);
        check_name(name).is_ok() && tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file())
    }

    async fn write(&self, name: &str, body: &[u8]) -> Result<(), PersistError> {
        check_name(name)?;

        let store = self.clone();
        let name = name.to_string();
        let body = body.to_vec();
        let path = tokio::task::spawn_blocking(move || store.write_blocking(&name, &body))
            .await
            .map_err(|e| io_error(&self.base_path, std::io::Error::other(e)))??;

        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }
}
