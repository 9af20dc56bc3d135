//! 运行日志服务 - 业务能力层
//!
//! 只负责"追加写运行日志"能力，不关心流程

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, warn};

/// 运行日志
///
/// 每个事件一行：`[ISO-8601 时间戳] 事件描述`，只追加不改写。
/// 写入失败只记录警告，不影响处理流程。
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 写入一行事件
    pub fn event(&self, message: impl AsRef<str>) {
        let line = format!(
            "[{}] {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            message.as_ref()
        );
        debug!("运行日志: {}", line.trim_end());

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));

        if let Err(e) = result {
            warn!("⚠️ 写入运行日志失败 {}: {}", self.path.display(), e);
        }
    }

    pub fn success(&self, item_id: &str, output: &Path) {
        self.event(format!("SUCCESS {} -> {}", item_id, output.display()));
    }

    pub fn error(&self, item_id: &str, attempt: u32, max: u32, stage: &str, error: &str) {
        self.event(format!(
            "ERROR {} attempt={}/{} stage={}: {}",
            item_id, attempt, max, stage, error
        ));
    }

    pub fn summary(&self, success: usize, failed: usize) {
        self.event(format!("success={} failed={}", success, failed));
    }
}
