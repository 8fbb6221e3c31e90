use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};

/// # PersistentCache
///
/// Persistent cache implementation based on storing JSON records in files,
/// one file per key. This implementation uses tokio runtime (with "fs" feature)
/// to prevent reading files from blocking other tasks.
///
/// The cache knows nothing about expiration: records carry their own timestamps
/// and the caller decides whether a record is still valid.
pub struct PersistentCache {
    cache_dir: PathBuf,
}

/// The error type for persistent cache `insert`/`get` operations
#[derive(Debug)]
pub enum Error {
    IOError(std::io::Error),
    SerializationError(serde_json::Error),
    DeserializationError(serde_json::Error),
}

impl PersistentCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Insert value into the cache
    ///
    /// Returns `IOError` if an error occurs while working with the file system,
    /// `SerializationError` if the value cannot be represented as JSON.
    ///
    /// The record is written to a temporary sibling file first and then renamed,
    /// so a reader never observes a half-written record.
    ///
    /// **Note:** This method creates all directories from `key`, if don't exist.
    pub async fn insert<K, V>(&mut self, key: K, value: &V) -> Result<(), Error>
    where
        K: AsRef<Path>,
        V: Serialize,
    {
        let serialized_value = serde_json::to_string(value).map_err(Error::SerializationError)?;
        let cache_entry_path = self.cache_dir.join(key);
        if let Some(parent_dir_path) = cache_entry_path.parent() {
            if !parent_dir_path.exists() {
                tokio::fs::create_dir_all(parent_dir_path).await?;
            }
        }
        let tmp_path = cache_entry_path.with_extension("tmp");
        let mut file = File::create(&tmp_path).await?;
        file.write_all(serialized_value.as_bytes()).await?;
        file.flush().await?;
        drop(file);
        tokio::fs::rename(tmp_path, cache_entry_path).await?;
        Ok(())
    }

    /// Get value from the cache
    ///
    /// Returns `Ok(None)` if there is no record for `key`,
    /// `IOError` if the record cannot be read and
    /// `DeserializationError` if [serde_json::from_str] cannot get its work done.
    pub async fn get<K, V>(&mut self, key: K) -> Result<Option<V>, Error>
    where
        K: AsRef<Path>,
        V: DeserializeOwned,
    {
        let cache_entry_path = self.cache_dir.join(key);
        if !cache_entry_path.exists() {
            return Ok(None);
        }
        let mut file = File::open(cache_entry_path).await?;
        let mut serialized_value = String::with_capacity(8192);
        file.read_to_string(&mut serialized_value).await?;
        let deserialized_value: V =
            serde_json::from_str(&serialized_value).map_err(Error::DeserializationError)?;
        Ok(Some(deserialized_value))
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::IOError(value)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IOError(e) => write!(f, "Persistent cache IO error: {}", e),
            Error::SerializationError(e) => {
                write!(f, "Persistent cache serialization error: {}", e)
            }
            Error::DeserializationError(e) => {
                write!(f, "Persistent cache deserialization error: {}", e)
            }
        }
    }
}

impl std::error::Error for Error {}
