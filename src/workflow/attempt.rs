//! 单次尝试的记录
//!
//! 只在一张图片的处理过程中存在，用于重试决策和诊断日志，不持久化

use std::fmt::Display;
use std::time::Duration;

/// 处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ready,
    Authenticate,
    SelectMode,
    SubmitFile,
    SubmitPrompt,
    Send,
    AwaitCompletion,
    Retrieve,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Ready => "ready",
            Stage::Authenticate => "authenticate",
            Stage::SelectMode => "select_mode",
            Stage::SubmitFile => "submit_file",
            Stage::SubmitPrompt => "submit_prompt",
            Stage::Send => "send",
            Stage::AwaitCompletion => "await_completion",
            Stage::Retrieve => "retrieve",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 一次尝试：编号从 1 开始，记录当前阶段和失败原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub number: u32,
    pub stage: Stage,
    pub error: Option<String>,
}

impl Attempt {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            stage: Stage::Ready,
            error: None,
        }
    }

    pub fn enter(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub fn fail(&mut self, error: impl Display) {
        self.error = Some(error.to_string());
    }

    pub fn is_last(&self, max_retries: u32) -> bool {
        self.number >= max_retries
    }
}

/// 第 `attempt` 次失败后的等待时间：`base * 2^(attempt-1)`
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(31);
    base.saturating_mul(1u32 << exp)
}
