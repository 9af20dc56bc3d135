//! 批量图片处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量图片的调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **断点续跑**：启动时读取进度记录，跳过已完成的图片
//! 2. **批量加载**：扫描输入目录，按文件名排序，可选限制数量
//! 3. **资源管理**：只在确实有工作时打开页面会话，结束时释放
//! 4. **串行处理**：页面会话只能串行使用，逐张委托 `ItemFlow`
//! 5. **进度落盘**：每张图片得到最终结果后立即保存进度
//! 6. **全局统计**：汇总成功/失败数量
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单张图片的细节
//! - **资源所有者**：唯一持有页面会话的模块
//! - **部分失败不升级**：单张图片失败只记录，不影响退出码

use std::path::Path;

use anyhow::{Context, Result};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::SurfaceError;
use crate::models::{discover_work_items, ResumeState, WorkItem};
use crate::services::{ChromeProvider, ChromeSettings, ResumeStore, RunLog, Surface, SurfaceProvider};
use crate::utils::logging::{self, format_elapsed};
use crate::workflow::{inter_item_delay, ItemFlow, ItemOutcome};

/// 一次运行的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub success: usize,
    pub failed: usize,
    /// 本次计划处理的数量（已排除之前完成的）
    pub total: usize,
}

/// 批量处理器
///
/// 对页面会话的具体实现一无所知，只通过 `SurfaceProvider` 打开会话
pub struct BatchRunner<P: SurfaceProvider> {
    config: Config,
    provider: P,
    store: ResumeStore,
    run_log: RunLog,
}

impl<P: SurfaceProvider> BatchRunner<P> {
    pub fn new(config: Config, provider: P) -> Self {
        let store = ResumeStore::new(config.state_file());
        let run_log = RunLog::new(config.run_log_file());
        Self {
            config,
            provider,
            store,
            run_log,
        }
    }

    /// 运行整个批次
    pub async fn run(&mut self) -> Result<RunSummary> {
        std::fs::create_dir_all(&self.config.output_dir).with_context(|| {
            format!("无法创建输出目录: {}", self.config.output_dir.display())
        })?;

        let mut state = self.store.load();
        let (items, already_done) = self.load_pending(&state).await?;
        logging::log_items_loaded(items.len(), already_done);

        let mut summary = RunSummary {
            total: items.len(),
            ..Default::default()
        };

        if items.is_empty() {
            info!("✓ 没有需要处理的图片，程序结束");
            self.run_log.event("NOTHING TO DO");
            return Ok(summary);
        }

        self.run_log.event(format!(
            "START pending={} skipped={}",
            items.len(),
            already_done
        ));

        let mut surface = self.provider.open().await?;
        let result = self
            .process_all(&mut surface, &items, &mut state, &mut summary)
            .await;

        if let Err(e) = surface.close().await {
            warn!("释放页面会话失败: {}", e);
        }
        result?;

        self.run_log.summary(summary.success, summary.failed);
        logging::print_final_stats(
            summary.success,
            summary.failed,
            summary.total,
            self.run_log.path(),
        );
        Ok(summary)
    }

    /// 扫描输入目录并去掉已完成的图片
    ///
    /// 之前运行中失败的图片会被重新处理
    async fn load_pending(&self, state: &ResumeState) -> Result<(Vec<WorkItem>, usize)> {
        info!("\n📁 正在扫描待处理的图片...");
        let all = discover_work_items(&self.config.input_dir).await?;
        let found = all.len();

        let processed = state.processed_ids();
        let mut pending: Vec<WorkItem> = all
            .into_iter()
            .filter(|item| !processed.contains(item.id.as_str()))
            .collect();
        let already_done = found - pending.len();

        if let Some(limit) = self.config.pipeline.limit {
            if pending.len() > limit {
                info!("📋 限制本次最多处理 {} 张", limit);
                pending.truncate(limit);
            }
        }
        Ok((pending, already_done))
    }

    async fn process_all(
        &self,
        surface: &mut P::Session,
        items: &[WorkItem],
        state: &mut ResumeState,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let pipeline = &self.config.pipeline;
        let mut flow = ItemFlow::new(pipeline, &self.run_log, &self.config.output_dir);

        // 登录只在批次开始时做一次；失败时交给第一张图片的流程重试
        match prepare_session(surface).await {
            Ok(()) => flow.mark_authenticated(),
            Err(e) => warn!("⚠️ 会话准备失败，将在处理图片时重试: {}", e),
        }

        let total = items.len();
        for (idx, item) in items.iter().enumerate() {
            logging::log_item_start(idx + 1, total, &item.file_name());

            let outcome = flow.run(surface, item).await;
            let succeeded = outcome.is_success();
            match outcome {
                ItemOutcome::Succeeded { .. } => {
                    state.mark_processed(&item.id);
                    summary.success += 1;
                }
                ItemOutcome::Failed { last } => {
                    error!(
                        "❌ [{}] 最终失败于阶段 {}: {}",
                        item.file_name(),
                        last.stage,
                        last.error.as_deref().unwrap_or("未知错误")
                    );
                    state.mark_failed(&item.id);
                    summary.failed += 1;
                }
            }
            self.save_state(state)?;

            if succeeded && idx + 1 < total {
                let wait = inter_item_delay(pipeline);
                info!("💤 等待 {} 后处理下一张", format_elapsed(wait));
                sleep(wait).await;
            }
        }
        Ok(())
    }

    fn save_state(&self, state: &ResumeState) -> Result<()> {
        self.store.save(state).with_context(|| {
            format!("无法保存进度记录: {}", self.store.path().display())
        })
    }
}

/// 打开页面并完成登录
async fn prepare_session<S: Surface>(surface: &mut S) -> std::result::Result<(), SurfaceError> {
    surface.ensure_ready().await?;
    surface.ensure_authenticated().await
}

/// 应用主结构
pub struct App {
    runner: BatchRunner<ChromeProvider>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);
        ensure_input_dir(&config.input_dir)?;

        let provider = ChromeProvider::new(ChromeSettings::from_config(&config));
        Ok(Self {
            runner: BatchRunner::new(config, provider),
        })
    }

    /// 运行应用主逻辑
    pub async fn run(mut self) -> Result<RunSummary> {
        self.runner.run().await
    }
}

fn ensure_input_dir(input_dir: &Path) -> Result<()> {
    if !input_dir.is_dir() {
        anyhow::bail!("输入目录不存在: {}", input_dir.display());
    }
    Ok(())
}
