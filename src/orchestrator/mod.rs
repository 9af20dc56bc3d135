//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ### `batch_processor` - 批量图片处理器
//! - 管理应用生命周期（初始化、运行、清理）
//! - 读取/保存进度记录，过滤已完成的图片
//! - 管理页面会话（只在有工作时打开）
//! - 控制两张图片之间的随机间隔
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<WorkItem>)
//!     ↓
//! workflow::ItemFlow (处理单张图片，重试/退避)
//!     ↓
//! services (能力层：Surface / ResumeStore / RunLog)
//!     ↓
//! infrastructure (基础设施：JsExecutor / Prober)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：编排层管批量，流程层管单张
//! 2. **资源隔离**：只有编排层持有页面会话
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **无业务逻辑**：只做调度和统计，不做具体页面操作

pub mod batch_processor;

pub use batch_processor::{App, BatchRunner, RunSummary};
