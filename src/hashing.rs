//! Hashing - SHA-256 Digests Of Produced Files
//!
//! Lets the host compare the output of repeated runs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileDigest {
    pub path: PathBuf,
    pub sha256: String,
    pub size: u64,
}

impl FileDigest {
    pub fn of(path: &Path) -> io::Result<Self> {
        let data = fs::read(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            sha256: sha256_hex(&data),
            size: data.len() as u64,
        })
    }
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}
