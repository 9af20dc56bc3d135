//! # Batch Upscale
//!
//! 通过浏览器页面批量放大图片的 Rust 应用程序，支持断点续跑
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 和 CDP 命令
//! - `Prober` - 按优先级轮询候选定位，带超时和心跳
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单张图片
//! - `Surface` / `SurfaceProvider` - 页面能力契约
//! - `ChromeSurface` - 基于 chromiumoxide 的实现
//! - `ResumeStore` - 进度记录读写
//! - `RunLog` - 追加写运行日志
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一张图片"的完整处理流程
//! - `Attempt` - 单次尝试（编号、当前阶段、错误）
//! - `ItemFlow` - 阶段编排 + 指数退避重试
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理器，管理会话、进度和统计
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Cli, Config, PipelineConfig};
pub use error::{AppError, Result, SurfaceError};
pub use infrastructure::{JsExecutor, Prober};
pub use models::{ResumeState, WorkItem};
pub use orchestrator::{App, BatchRunner, RunSummary};
pub use services::{Surface, SurfaceProvider};
pub use workflow::{ItemFlow, ItemOutcome};
