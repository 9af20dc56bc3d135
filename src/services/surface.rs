//! 页面能力契约 - 业务能力层
//!
//! 流水线只依赖这里的两个 trait，不关心背后是真实浏览器还是测试替身。
//! 每个方法对应一个处理阶段，失败时返回可区分的 `SurfaceError`。

#![allow(async_fn_in_trait)]

use std::path::Path;

use crate::error::{AppError, SurfaceError};

/// 一个已打开、只能串行使用的页面会话
pub trait Surface {
    /// 确保输入框可用，必要时打开新的会话页面
    async fn ensure_ready(&mut self) -> Result<(), SurfaceError>;

    /// 等待登录完成（可能需要人工在浏览器里登录，超时很长）
    async fn ensure_authenticated(&mut self) -> Result<(), SurfaceError>;

    /// 选择处理模式
    ///
    /// 找不到模式菜单不算失败；选择后无法确认才算失败
    async fn select_mode(&mut self, mode_name: &str) -> Result<(), SurfaceError>;

    /// 附加一个本地文件
    async fn submit_file(&mut self, path: &Path) -> Result<(), SurfaceError>;

    /// 填写提示词
    async fn submit_prompt(&mut self, text: &str) -> Result<(), SurfaceError>;

    /// 发送请求
    async fn send(&mut self) -> Result<(), SurfaceError>;

    /// 等待处理完成，结果可供下载
    async fn await_completion(&mut self) -> Result<(), SurfaceError>;

    /// 下载结果到 `destination`，0 字节视为失败
    async fn retrieve_result(&mut self, destination: &Path) -> Result<(), SurfaceError>;

    /// 保存调试现场（截图、HTML 等），默认不做任何事
    async fn capture_debug(&mut self, _label: &str) -> Result<(), SurfaceError> {
        Ok(())
    }

    /// 释放会话
    async fn close(self) -> Result<(), SurfaceError>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// 会话工厂
///
/// 编排层只在确实有工作时才调用 `open`
pub trait SurfaceProvider {
    type Session: Surface;

    async fn open(&mut self) -> Result<Self::Session, AppError>;
}
