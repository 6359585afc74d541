//! Size-bounded log file with numbered backups.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::config::LogSinkConfig;
use crate::sink::{DurableSink, SinkError};

struct ActiveFile {
    /// `None` after a failed rotation; reopened on the next append.
    file: Option<File>,
    size: u64,
}

/// Appends lines to `<dir>/<name>`, rotating to `<name>.1 .. <name>.N` by size.
pub struct RotatingFileSink {
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
    active: Mutex<ActiveFile>,
}

impl RotatingFileSink {
    /// Create the directory if needed and open the active file for appending.
    pub fn open(config: &LogSinkConfig) -> Result<Self, SinkError> {
        fs::create_dir_all(&config.directory).map_err(|source| SinkError::Open {
            path: config.directory.clone(),
            source,
        })?;

        let path = config.path();
        let (file, size) = open_append(&path)?;

        tracing::info!(
            path = %path.display(),
            size,
            max_bytes = config.max_bytes,
            backup_count = config.backup_count,
            "Durable log sink opened"
        );

        Ok(Self {
            path,
            max_bytes: config.max_bytes,
            backup_count: config.backup_count,
            active: Mutex::new(ActiveFile {
                file: Some(file),
                size,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&self, active: &mut ActiveFile) -> Result<(), SinkError> {
        // Close before renaming.
        active.file = None;

        let rotate_err = |source| SinkError::Rotate {
            path: self.path.clone(),
            source,
        };

        if self.backup_count == 0 {
            let file = File::create(&self.path).map_err(rotate_err)?;
            active.file = Some(file);
            active.size = 0;
            return Ok(());
        }

        // Shift app.log.(n-1) → app.log.n; the rename onto the last slot drops the oldest.
        for index in (1..self.backup_count).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1)).map_err(rotate_err)?;
            }
        }
        fs::rename(&self.path, self.backup_path(1)).map_err(rotate_err)?;

        let (file, size) = open_append(&self.path)?;
        active.file = Some(file);
        active.size = size;

        tracing::debug!(path = %self.path.display(), "Rotated durable log");
        Ok(())
    }
}

impl DurableSink for RotatingFileSink {
    fn append(&self, line: &str) -> Result<(), SinkError> {
        let mut record = line.to_string();
        if !record.ends_with('\n') {
            record.push('\n');
        }
        let len = record.len() as u64;

        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);

        if active.file.is_none() {
            let (file, size) = open_append(&self.path)?;
            active.file = Some(file);
            active.size = size;
        }

        // Reaching max_bytes rolls over. An oversized record still lands in an
        // empty file; newest lines are never dropped.
        if active.size > 0 && active.size + len >= self.max_bytes {
            self.rotate(&mut active)?;
        }

        let Some(file) = active.file.as_mut() else {
            return Err(SinkError::Write(io::Error::new(
                io::ErrorKind::NotFound,
                "log file not open",
            )));
        };
        file.write_all(record.as_bytes())?;
        active.size += len;
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<(File, u64), SinkError> {
    let open_err = |source| SinkError::Open {
        path: path.to_path_buf(),
        source,
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(open_err)?;
    let size = file.metadata().map_err(open_err)?.len();
    Ok((file, size))
}
