//! Upload storage for expediente documents and scanned contracts.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid storage path '{0}'")]
    InvalidPath(String),
    #[error("stored file '{0}' not found")]
    NotFound(String),
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
}

/// Byte storage addressed by forward-slash relative keys.
pub trait FileStore: Send + Sync {
    /// Persist `bytes` under `key`, returning the key actually used.
    fn save(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError>;
    fn read(&self, key: &str) -> Result<Vec<u8>, StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Key for a file in a beneficiary's expediente folder.
pub fn expediente_key(documento_identidad: &str, file_name: &str) -> String {
    format!(
        "expedientes/{}/{}",
        sanitize_segment(documento_identidad),
        sanitize_segment(file_name)
    )
}

/// Key for a scanned contract, bucketed by upload month.
pub fn scanned_contract_key(uploaded_on: NaiveDate, file_name: &str) -> String {
    format!(
        "contratos/expedientes/{}/{}",
        uploaded_on.format("%Y/%m"),
        sanitize_segment(file_name)
    )
}

pub(crate) fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "archivo".to_string()
    } else {
        cleaned
    }
}

/// Alternate key used when `key` is taken: `name.pdf` -> `name_1.pdf`.
pub(crate) fn numbered_key(key: &str, attempt: usize) -> String {
    let (dir, file) = match key.rsplit_once('/') {
        Some((dir, file)) => (format!("{dir}/"), file),
        None => (String::new(), key),
    };
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{dir}{stem}_{attempt}.{ext}"),
        _ => format!("{dir}{file}_{attempt}"),
    }
}

/// File store rooted at the configured media directory.
#[derive(Debug, Clone)]
pub struct FsFileStore {
    root: PathBuf,
}

impl FsFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if key.is_empty() || !safe {
            return Err(StorageError::InvalidPath(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl FileStore for FsFileStore {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let mut candidate = key.to_string();
        let mut attempt = 0;
        while self.resolve(&candidate)?.exists() {
            attempt += 1;
            candidate = numbered_key(key, attempt);
        }
        let path = self.resolve(&candidate)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(candidate)
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        fs::read(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::Io(err),
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}
