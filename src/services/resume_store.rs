//! 进度记录存储 - 业务能力层
//!
//! 只负责"读写进度文件"能力，不关心流程

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::models::ResumeState;

/// 进度记录存储
///
/// 职责：
/// - 启动时加载一次进度记录
/// - 每次状态变化后整体重写文件
/// - 文件缺失或损坏时降级为空记录，不中断运行
pub struct ResumeStore {
    path: PathBuf,
}

impl ResumeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 加载进度记录
    pub fn load(&self) -> ResumeState {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("进度文件不存在，从空记录开始: {}", self.path.display());
                return ResumeState::default();
            }
            Err(e) => {
                warn!("⚠️ 无法读取进度文件 {}: {}，从空记录开始", self.path.display(), e);
                return ResumeState::default();
            }
        };

        match serde_json::from_str::<ResumeState>(&content) {
            Ok(state) => state.sanitized(),
            Err(source) => {
                let err = AppError::MalformedState {
                    path: self.path.clone(),
                    source,
                };
                warn!("⚠️ {}，从空记录开始", err);
                ResumeState::default()
            }
        }
    }

    /// 同步写入进度记录
    ///
    /// 先写临时文件再重命名，进程中途退出不会留下半截文件
    pub fn save(&self, state: &ResumeState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| AppError::Config(format!("进度记录序列化失败: {}", e)))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        debug!(
            "进度已保存: 成功 {} | 失败 {}",
            state.processed.len(),
            state.failed.len()
        );
        Ok(())
    }
}
