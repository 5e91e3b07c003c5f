use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use rayon::prelude::*;

use crate::logging;

/// 單檔上限 10 MB
const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;
/// 保留 7 天
const DEFAULT_RETAIN_DAYS: u64 = 7;

/// 依日期切檔，單日超過大小上限時以世代編號續寫。
///
/// 檔名由 `pattern` 經 `chrono` 格式化而來，例如 `log/%Y-%m-%d_default_info.log`，
/// 世代 1 之後的檔名為 `log/2026-10-16_default_info.1.log`。
pub struct Rotate {
    pattern: String,
    /// 目前日期對應的基礎檔名
    day_fn: String,
    generation: u32,
    written: u64,
    max_bytes: u64,
    retain: Duration,
    writer: Option<BufWriter<File>>,
}

impl Rotate {
    pub fn new(pattern: String) -> Self {
        Self::with_limits(pattern, DEFAULT_MAX_BYTES, DEFAULT_RETAIN_DAYS)
    }

    pub fn with_limits(pattern: String, max_bytes: u64, retain_days: u64) -> Self {
        Rotate {
            pattern,
            day_fn: String::new(),
            generation: 0,
            written: 0,
            max_bytes,
            retain: Duration::from_secs(retain_days * 24 * 60 * 60),
            writer: None,
        }
    }

    /// 寫入一段已格式化的日誌，必要時先換檔。
    pub fn write_msg(&mut self, now: DateTime<Local>, msg: &[u8]) -> Result<()> {
        let day_fn = now.format(&self.pattern).to_string();
        if day_fn != self.day_fn {
            self.day_fn = day_fn;
            self.generation = 0;
            self.open()?;
            self.purge_expired();
        } else if self.written + msg.len() as u64 > self.max_bytes {
            self.generation += 1;
            self.open()?;
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| anyhow!("log writer is not opened: {}", self.day_fn))?;
        writer.write_all(msg)?;
        writer.flush()?;
        self.written += msg.len() as u64;

        Ok(())
    }

    fn file_name(&self) -> PathBuf {
        if self.generation == 0 {
            return PathBuf::from(&self.day_fn);
        }

        let path = Path::new(&self.day_fn);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("log");
        path.with_file_name(format!("{}.{}.{}", stem, self.generation, ext))
    }

    fn open(&mut self) -> Result<()> {
        if let Some(mut old) = self.writer.take() {
            let _ = old.flush();
        }

        let path = self.file_name();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.written = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.writer = Some(BufWriter::with_capacity(4096, file));

        Ok(())
    }

    /// 刪除同目錄下最後修改時間超過保留期限的檔案
    fn purge_expired(&self) {
        let dir = match Path::new(&self.day_fn).parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(why) => {
                logging::error_console(format!(
                    "Failed to read_dir({}) because {:?}",
                    dir.display(),
                    why
                ));
                return;
            }
        };

        let cut_off = SystemTime::now()
            .checked_sub(self.retain)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let expired: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                fs::metadata(path)
                    .and_then(|m| m.modified())
                    .map(|modified| modified <= cut_off)
                    .unwrap_or(false)
            })
            .collect();

        expired
            .par_iter()
            .with_min_len(num_cpus::get())
            .for_each(|path| {
                if let Err(why) = fs::remove_file(path) {
                    logging::error_console(format!(
                        "couldn't remove the file({}). because {:?}",
                        path.display(),
                        why
                    ));
                }
            });
    }
}

impl Drop for Rotate {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }
}
