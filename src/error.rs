use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// 单次尝试内的阶段错误
///
/// 由 `Surface` 的各阶段返回，在 `ItemFlow` 边界被捕获并驱动重试决策，
/// 不会中断整个批次。
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// 必需能力的所有候选在超时内都未变为可用
    #[error("等待能力超时: {capability} (超时 {timeout:?})")]
    CapabilityTimeout {
        capability: &'static str,
        timeout: Duration,
    },
    /// 能力在单次检查中不存在
    #[error("未找到能力: {capability}")]
    NotFound { capability: &'static str },
    /// 提交机制已执行，但页面没有接受
    #[error("提交被拒绝 ({what}): {reason}")]
    SubmissionRejected { what: &'static str, reason: String },
    /// 下载完成但文件为 0 字节
    #[error("结果文件为空: {}", .path.display())]
    EmptyResult { path: PathBuf },
    /// CDP 通信失败
    #[error("浏览器驱动错误: {0}")]
    Driver(String),
    /// 本地文件操作失败
    #[error("文件操作失败: {0}")]
    Io(#[from] std::io::Error),
}

impl SurfaceError {
    /// 用于日志的简短分类名
    pub fn kind(&self) -> &'static str {
        match self {
            SurfaceError::CapabilityTimeout { .. } => "CapabilityTimeout",
            SurfaceError::NotFound { .. } => "NotFound",
            SurfaceError::SubmissionRejected { .. } => "SubmissionRejected",
            SurfaceError::EmptyResult { .. } => "EmptyResult",
            SurfaceError::Driver(_) => "Driver",
            SurfaceError::Io(_) => "Io",
        }
    }
}

impl From<chromiumoxide::error::CdpError> for SurfaceError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        SurfaceError::Driver(e.to_string())
    }
}

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 会话配置目录被另一个存活的浏览器进程占用（致命）
    #[error("会话配置目录已被其他进程锁定: {} (持有者: {holder})", .profile.display())]
    SessionLockConflict { profile: PathBuf, holder: String },
    /// 进度记录存在但无法解析（只用于日志，随后降级为空状态）
    #[error("进度记录无法解析: {}: {source}", .path.display())]
    MalformedState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// 启动或连接浏览器失败
    #[error("浏览器错误: {0}")]
    Browser(String),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_error_kind() {
        let err = SurfaceError::CapabilityTimeout {
            capability: "prompt input",
            timeout: Duration::from_secs(3),
        };
        assert_eq!(err.kind(), "CapabilityTimeout");
        assert!(err.to_string().contains("prompt input"));

        let err = SurfaceError::EmptyResult {
            path: PathBuf::from("out/a_upscaled.jpg"),
        };
        assert_eq!(err.kind(), "EmptyResult");
        assert!(err.to_string().contains("a_upscaled.jpg"));
    }

    #[test]
    fn test_lock_conflict_message() {
        let err = AppError::SessionLockConflict {
            profile: PathBuf::from("browser_profile"),
            holder: "host-4242".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("browser_profile"));
        assert!(msg.contains("host-4242"));
    }
}
