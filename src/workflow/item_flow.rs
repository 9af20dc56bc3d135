//! 单张图片处理流程 - 流程层
//!
//! 核心职责：定义"一张图片"的完整处理流程和重试策略
//!
//! 流程顺序（每次尝试从头开始）：
//! 1. ready → authenticate（全局一次）→ select_mode
//! 2. submit_file → submit_prompt → send
//! 3. await_completion → retrieve
//!
//! 任一阶段失败：记录阶段和错误，未达上限则指数退避后重试

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::error::SurfaceError;
use crate::models::{assign_output, WorkItem};
use crate::services::run_log::RunLog;
use crate::services::surface::Surface;
use crate::utils::logging::format_elapsed;
use crate::workflow::attempt::{backoff_delay, Attempt, Stage};

/// 一张图片的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// 结果已保存到 `output`
    Succeeded { output: PathBuf, attempts: u32 },
    /// 用尽所有尝试，`last` 是最后一次失败
    Failed { last: Attempt },
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Succeeded { .. })
    }
}

/// 图片处理流程
///
/// - 编排阶段顺序和重试
/// - 不持有页面会话，由调用方传入
/// - 登录状态在整个批次内共享
pub struct ItemFlow<'a> {
    config: &'a PipelineConfig,
    run_log: &'a RunLog,
    output_dir: &'a Path,
    authenticated: bool,
}

impl<'a> ItemFlow<'a> {
    pub fn new(config: &'a PipelineConfig, run_log: &'a RunLog, output_dir: &'a Path) -> Self {
        Self {
            config,
            run_log,
            output_dir,
            authenticated: false,
        }
    }

    /// 批次开始时已经完成登录
    pub fn mark_authenticated(&mut self) {
        self.authenticated = true;
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub async fn run<S: Surface>(&mut self, surface: &mut S, item: &WorkItem) -> ItemOutcome {
        let max = self.config.max_retries.max(1);
        let mut number = 1;

        loop {
            let mut attempt = Attempt::new(number);
            if number > 1 {
                info!("🔁 [{}] 第 {}/{} 次尝试", item.file_name(), number, max);
            }

            match self.run_stages(surface, item, &mut attempt).await {
                Ok(output) => {
                    self.run_log.success(&item.id, &output);
                    return ItemOutcome::Succeeded {
                        output,
                        attempts: number,
                    };
                }
                Err(e) => {
                    attempt.fail(&e);
                    warn!(
                        "❌ [{}] 阶段 {} 失败 ({}/{}) [{}]: {}",
                        item.file_name(),
                        attempt.stage,
                        number,
                        max,
                        e.kind(),
                        e
                    );
                    self.run_log
                        .error(&item.id, number, max, attempt.stage.label(), &e.to_string());

                    let label = format!("{}_{}", item.file_name(), attempt.stage);
                    if let Err(capture) = surface.capture_debug(&label).await {
                        debug!("保存调试现场失败: {}", capture);
                    }

                    if attempt.is_last(max) {
                        error!("❌ [{}] 已用尽 {} 次尝试，放弃", item.file_name(), max);
                        return ItemOutcome::Failed { last: attempt };
                    }

                    let wait = backoff_delay(self.config.base_backoff, number);
                    info!("⏳ {} 后重试", format_elapsed(wait));
                    sleep(wait).await;
                    number += 1;
                }
            }
        }
    }

    /// 按顺序执行所有阶段，`attempt.stage` 始终指向当前阶段
    async fn run_stages<S: Surface>(
        &mut self,
        surface: &mut S,
        item: &WorkItem,
        attempt: &mut Attempt,
    ) -> Result<PathBuf, SurfaceError> {
        attempt.enter(Stage::Ready);
        surface.ensure_ready().await?;

        if !self.authenticated {
            attempt.enter(Stage::Authenticate);
            surface.ensure_authenticated().await?;
            self.authenticated = true;
        }

        attempt.enter(Stage::SelectMode);
        surface.select_mode(&self.config.mode_name).await?;

        attempt.enter(Stage::SubmitFile);
        surface.submit_file(&item.path).await?;

        attempt.enter(Stage::SubmitPrompt);
        surface.submit_prompt(&self.config.prompt).await?;

        attempt.enter(Stage::Send);
        surface.send().await?;

        attempt.enter(Stage::AwaitCompletion);
        surface.await_completion().await?;

        attempt.enter(Stage::Retrieve);
        let output = assign_output(self.output_dir, item);
        surface.retrieve_result(&output).await?;

        info!("✅ [{}] → {}", item.file_name(), output.display());
        Ok(output)
    }
}

/// 两张图片之间的随机间隔，在 `[min, max]` 内均匀分布（毫秒精度）
pub fn inter_item_delay(config: &PipelineConfig) -> Duration {
    let min = config.min_delay.as_millis() as u64;
    let max = config.max_delay.as_millis() as u64;
    if max <= min {
        return Duration::from_millis(min);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tempfile::tempdir;

    /// 按脚本在指定阶段失败的页面替身
    #[derive(Default)]
    struct ScriptedSurface {
        /// 每次尝试在哪个阶段失败，`None` 表示这次成功
        failures: VecDeque<Option<Stage>>,
        calls: Vec<&'static str>,
        captures: Vec<String>,
    }

    impl ScriptedSurface {
        fn failing(failures: impl IntoIterator<Item = Option<Stage>>) -> Self {
            Self {
                failures: failures.into_iter().collect(),
                ..Default::default()
            }
        }

        fn step(&mut self, stage: Stage) -> Result<(), SurfaceError> {
            self.calls.push(stage.label());
            if self.failures.front() == Some(&Some(stage)) {
                self.failures.pop_front();
                return Err(SurfaceError::CapabilityTimeout {
                    capability: "test",
                    timeout: Duration::from_secs(1),
                });
            }
            Ok(())
        }
    }

    impl Surface for ScriptedSurface {
        async fn ensure_ready(&mut self) -> Result<(), SurfaceError> {
            self.step(Stage::Ready)
        }
        async fn ensure_authenticated(&mut self) -> Result<(), SurfaceError> {
            self.step(Stage::Authenticate)
        }
        async fn select_mode(&mut self, _mode_name: &str) -> Result<(), SurfaceError> {
            self.step(Stage::SelectMode)
        }
        async fn submit_file(&mut self, _path: &Path) -> Result<(), SurfaceError> {
            self.step(Stage::SubmitFile)
        }
        async fn submit_prompt(&mut self, _text: &str) -> Result<(), SurfaceError> {
            self.step(Stage::SubmitPrompt)
        }
        async fn send(&mut self) -> Result<(), SurfaceError> {
            self.step(Stage::Send)
        }
        async fn await_completion(&mut self) -> Result<(), SurfaceError> {
            self.step(Stage::AwaitCompletion)
        }
        async fn retrieve_result(&mut self, destination: &Path) -> Result<(), SurfaceError> {
            self.step(Stage::Retrieve)?;
            std::fs::write(destination, b"upscaled")?;
            Ok(())
        }
        async fn capture_debug(&mut self, label: &str) -> Result<(), SurfaceError> {
            self.captures.push(label.to_string());
            Ok(())
        }
    }

    fn test_config(max_retries: u32) -> PipelineConfig {
        PipelineConfig {
            max_retries,
            base_backoff: Duration::from_secs(5),
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let dir = tempdir().unwrap();
        let config = test_config(3);
        let run_log = RunLog::new(dir.path().join("log.txt"));
        let item = WorkItem::new(dir.path().join("a.jpg"));
        let mut surface = ScriptedSurface::default();

        let mut flow = ItemFlow::new(&config, &run_log, dir.path());
        let outcome = flow.run(&mut surface, &item).await;

        assert_eq!(
            outcome,
            ItemOutcome::Succeeded {
                output: dir.path().join("a_upscaled.jpg"),
                attempts: 1
            }
        );
        assert!(flow.is_authenticated());
        assert_eq!(
            surface.calls,
            vec![
                "ready",
                "authenticate",
                "select_mode",
                "submit_file",
                "submit_prompt",
                "send",
                "await_completion",
                "retrieve"
            ]
        );
        let log = std::fs::read_to_string(run_log.path()).unwrap();
        assert!(log.contains(&format!("SUCCESS {}", item.id)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_restarts_from_ready_with_backoff() {
        let dir = tempdir().unwrap();
        let config = test_config(3);
        let run_log = RunLog::new(dir.path().join("log.txt"));
        let item = WorkItem::new(dir.path().join("a.jpg"));
        let mut surface = ScriptedSurface::failing([Some(Stage::Send), Some(Stage::AwaitCompletion)]);

        let mut flow = ItemFlow::new(&config, &run_log, dir.path());
        flow.mark_authenticated();
        let start = tokio::time::Instant::now();
        let outcome = flow.run(&mut surface, &item).await;

        assert!(outcome.is_success());
        // 5s + 10s
        assert!(start.elapsed() >= Duration::from_secs(15));
        assert_eq!(surface.calls.iter().filter(|c| **c == "ready").count(), 3);
        assert!(!surface.calls.contains(&"authenticate"));
        assert_eq!(surface.captures, vec!["a.jpg_send", "a.jpg_await_completion"]);

        let log = std::fs::read_to_string(run_log.path()).unwrap();
        assert!(log.contains("attempt=1/3 stage=send"));
        assert!(log.contains("attempt=2/3 stage=await_completion"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_fail() {
        let dir = tempdir().unwrap();
        let config = test_config(2);
        let run_log = RunLog::new(dir.path().join("log.txt"));
        let item = WorkItem::new(dir.path().join("b.png"));
        let mut surface =
            ScriptedSurface::failing([Some(Stage::SubmitFile), Some(Stage::SubmitFile)]);

        let mut flow = ItemFlow::new(&config, &run_log, dir.path());
        let outcome = flow.run(&mut surface, &item).await;

        match outcome {
            ItemOutcome::Failed { last } => {
                assert_eq!(last.number, 2);
                assert_eq!(last.stage, Stage::SubmitFile);
                assert!(last.error.is_some());
            }
            other => panic!("应该失败: {:?}", other),
        }
        let log = std::fs::read_to_string(run_log.path()).unwrap();
        assert_eq!(log.lines().filter(|l| l.contains("ERROR")).count(), 2);
        assert!(!dir.path().join("b_upscaled.png").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_authentication_failure_is_retried() {
        let dir = tempdir().unwrap();
        let config = test_config(3);
        let run_log = RunLog::new(dir.path().join("log.txt"));
        let item = WorkItem::new(dir.path().join("a.jpg"));
        let mut surface = ScriptedSurface::failing([Some(Stage::Authenticate)]);

        let mut flow = ItemFlow::new(&config, &run_log, dir.path());
        let outcome = flow.run(&mut surface, &item).await;

        assert_eq!(
            outcome,
            ItemOutcome::Succeeded {
                output: dir.path().join("a_upscaled.jpg"),
                attempts: 2
            }
        );
        assert_eq!(surface.calls.iter().filter(|c| **c == "authenticate").count(), 2);
    }

    #[test]
    fn test_inter_item_delay_within_bounds() {
        let config = PipelineConfig {
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(200),
            ..Default::default()
        };
        for _ in 0..50 {
            let d = inter_item_delay(&config);
            assert!(d >= Duration::from_millis(100) && d <= Duration::from_millis(200));
        }

        let fixed = PipelineConfig {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(1),
            ..Default::default()
        };
        assert_eq!(inter_item_delay(&fixed), Duration::from_secs(1));
    }
}
