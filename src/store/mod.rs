//! Optional on-disk state under `STATE_DIR`.
//!
//! `cursor.txt` holds `key=value` lines; `wallets.jsonl` holds one
//! [`WalletProfile`] per line. Unknown keys and fields are ignored on load so
//! older and newer builds can share a directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;

use crate::models::WalletProfile;

const CURSOR_FILE: &str = "cursor.txt";
const WALLETS_FILE: &str = "wallets.jsonl";
const CURSOR_KEY: &str = "last_processed_block";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `None` when no cursor has been saved yet.
    pub fn load_cursor(&self) -> Result<Option<u64>, StoreError> {
        let path = self.dir.join(CURSOR_FILE);
        let Some(contents) = read_optional(&path)? else {
            return Ok(None);
        };

        let block = contents
            .lines()
            .filter_map(|line| line.split_once('='))
            .find(|(key, _)| key.trim() == CURSOR_KEY)
            .and_then(|(_, value)| value.trim().parse::<u64>().ok());

        if block.is_none() {
            tracing::warn!(path = %path.display(), "Cursor file has no usable block number");
        }
        Ok(block)
    }

    pub fn save_cursor(&self, block: u64) -> Result<(), StoreError> {
        let contents = format!(
            "{CURSOR_KEY}={block}\nupdated_at={}\n",
            Utc::now().to_rfc3339()
        );
        write_atomic(&self.dir.join(CURSOR_FILE), contents.as_bytes())
    }

    /// Malformed lines are skipped with a warning.
    pub fn load_profiles(&self) -> Result<Vec<WalletProfile>, StoreError> {
        let path = self.dir.join(WALLETS_FILE);
        let Some(contents) = read_optional(&path)? else {
            return Ok(Vec::new());
        };

        let mut profiles = Vec::new();
        for (lineno, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WalletProfile>(line) {
                Ok(p) => profiles.push(p),
                Err(e) => tracing::warn!(
                    line = lineno + 1,
                    error = %e,
                    "Skipping malformed wallet profile"
                ),
            }
        }
        Ok(profiles)
    }

    pub fn save_profiles<'a>(
        &self,
        profiles: impl IntoIterator<Item = &'a WalletProfile>,
    ) -> Result<usize, StoreError> {
        let mut buf = Vec::new();
        let mut count = 0;
        for profile in profiles {
            serde_json::to_writer(&mut buf, profile)?;
            buf.push(b'\n');
            count += 1;
        }
        write_atomic(&self.dir.join(WALLETS_FILE), &buf)?;
        Ok(count)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp).map_err(io_err(&tmp))?;
        file.write_all(bytes).map_err(io_err(&tmp))?;
        file.sync_all().map_err(io_err(&tmp))?;
    }
    fs::rename(&tmp, path).map_err(io_err(path))
}
