use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// 跨运行的进度记录
///
/// `processed` 与 `failed` 互不相交，同一个 id 最多出现一次。
/// 两个列表都保持首次加入的顺序。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    #[serde(default)]
    pub processed: Vec<String>,
    #[serde(default)]
    pub failed: Vec<String>,
}

impl ResumeState {
    pub fn is_processed(&self, id: &str) -> bool {
        self.processed.iter().any(|p| p == id)
    }

    /// 已完成 id 的集合，用于过滤整个工作列表
    pub fn processed_ids(&self) -> HashSet<&str> {
        self.processed.iter().map(String::as_str).collect()
    }

    pub fn is_failed(&self, id: &str) -> bool {
        self.failed.iter().any(|f| f == id)
    }

    /// 记录成功
    ///
    /// 之前运行失败、本次重试成功的 id 会从 `failed` 移到 `processed`
    pub fn mark_processed(&mut self, id: &str) -> bool {
        self.failed.retain(|f| f != id);
        if self.is_processed(id) {
            return false;
        }
        self.processed.push(id.to_string());
        true
    }

    /// 记录最终失败（已耗尽重试次数）
    ///
    /// 已成功的 id 不会被降级为失败
    pub fn mark_failed(&mut self, id: &str) -> bool {
        if self.is_processed(id) || self.is_failed(id) {
            return false;
        }
        self.failed.push(id.to_string());
        true
    }

    /// 修复手工编辑造成的重复或交叉
    pub fn sanitized(self) -> Self {
        let mut seen = HashSet::new();
        let processed: Vec<String> = self
            .processed
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        let failed: Vec<String> = self
            .failed
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        Self { processed, failed }
    }
}
