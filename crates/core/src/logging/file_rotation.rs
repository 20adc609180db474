use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Result as IoResult, Write};
use std::path::{Path, PathBuf};

/// Size-based rolling file appender
///
/// Writes `{prefix}.log`. When the next write would push the live file past
/// `max_size_bytes`:
/// 1. Current file is closed
/// 2. Backups shift up: `{prefix}.{n}.log` is dropped once it would exceed
///    `backup_count`, `{prefix}.1.log` becomes `{prefix}.2.log`, etc.
/// 3. The live file becomes `{prefix}.1.log`
/// 4. A fresh live file is opened
///
/// Rotation is disabled when either `max_size_bytes` or `backup_count` is
/// zero; the live file then grows without bound and nothing is discarded.
///
/// Not internally synchronised; share it behind a `Mutex`.
#[derive(Debug)]
pub struct SizeBasedAppender {
    directory: PathBuf,
    file_prefix: String,
    max_size_bytes: u64,
    backup_count: usize,
    current_file: Option<BufWriter<File>>,
    current_size: u64,
}

impl SizeBasedAppender {
    /// Create a new size-based appender, creating `directory` if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the existing
    /// log file cannot be inspected
    pub fn new(
        directory: impl Into<PathBuf>,
        file_prefix: impl Into<String>,
        max_size_bytes: u64,
        backup_count: usize,
    ) -> IoResult<Self> {
        let directory = directory.into();
        let file_prefix = file_prefix.into();
        std::fs::create_dir_all(&directory)?;

        let current_path = live_path(&directory, &file_prefix);
        let current_size = if current_path.exists() {
            current_path.metadata()?.len()
        } else {
            0
        };

        Ok(Self {
            directory,
            file_prefix,
            max_size_bytes,
            backup_count,
            current_file: None,
            current_size,
        })
    }

    /// Path of the live log file
    pub fn path(&self) -> PathBuf {
        live_path(&self.directory, &self.file_prefix)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.directory.join(format!("{}.{index}.log", self.file_prefix))
    }

    fn needs_rotation(&self, incoming: usize) -> bool {
        self.max_size_bytes > 0
            && self.backup_count > 0
            && self.current_size > 0
            && self.current_size + incoming as u64 > self.max_size_bytes
    }

    fn rotate_files(&mut self) -> IoResult<()> {
        if let Some(mut writer) = self.current_file.take() {
            writer.flush()?;
        }

        let oldest = self.backup_path(self.backup_count);
        if oldest.exists() {
            std::fs::remove_file(oldest)?;
        }
        for i in (1..self.backup_count).rev() {
            let old_path = self.backup_path(i);
            if old_path.exists() {
                std::fs::rename(old_path, self.backup_path(i + 1))?;
            }
        }
        let current_path = self.path();
        if current_path.exists() {
            std::fs::rename(current_path, self.backup_path(1))?;
        }

        self.current_size = 0;
        Ok(())
    }

    fn writer(&mut self) -> IoResult<&mut BufWriter<File>> {
        if self.current_file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.path())?;
            self.current_file = Some(BufWriter::new(file));
        }
        self.current_file
            .as_mut()
            .ok_or_else(|| std::io::Error::other("log file unavailable"))
    }
}

fn live_path(directory: &Path, file_prefix: &str) -> PathBuf {
    directory.join(format!("{file_prefix}.log"))
}

impl Write for SizeBasedAppender {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        if self.needs_rotation(buf.len()) {
            self.rotate_files()?;
        }

        let writer = self.writer()?;
        writer.write_all(buf)?;
        writer.flush()?;

        self.current_size += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        if let Some(writer) = self.current_file.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}
