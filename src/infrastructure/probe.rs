//! 能力探测 - 基础设施层
//!
//! 同一个逻辑能力（例如"提示词输入框"）在页面上可能有多种定位方式。
//! 调用方按优先级给出候选列表，`Prober` 按固定间隔轮询整张列表，
//! 每一轮中排在前面的可用候选胜出。
//!
//! 探测函数只返回 `bool`，内部出错一律视为"不可用"。

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// 默认轮询间隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// 在超时内没有任何候选可用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut {
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct Prober {
    poll_interval: Duration,
}

impl Default for Prober {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl Prober {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// 单轮非阻塞检查，返回第一个可用候选
    pub async fn find_any<'a, C, F, Fut>(&self, candidates: &'a [C], mut probe: F) -> Option<&'a C>
    where
        F: FnMut(&'a C) -> Fut,
        Fut: Future<Output = bool>,
    {
        for candidate in candidates {
            if probe(candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    /// 单轮非阻塞检查，只关心是否有候选可用
    pub async fn check_any<'a, C, F, Fut>(&self, candidates: &'a [C], probe: F) -> bool
    where
        F: FnMut(&'a C) -> Fut,
        Fut: Future<Output = bool>,
    {
        self.find_any(candidates, probe).await.is_some()
    }

    /// 轮询直到某个候选可用或超时
    pub async fn await_any<'a, C, F, Fut>(
        &self,
        candidates: &'a [C],
        timeout: Duration,
        probe: F,
    ) -> Result<&'a C, TimedOut>
    where
        F: FnMut(&'a C) -> Fut,
        Fut: Future<Output = bool>,
    {
        self.await_any_with_heartbeat(candidates, timeout, Duration::MAX, |_| {}, probe)
            .await
    }

    /// 与 `await_any` 相同，但每隔 `every` 调用一次 `heartbeat(已等待时长)`
    ///
    /// 心跳不影响控制流
    pub async fn await_any_with_heartbeat<'a, C, F, Fut, H>(
        &self,
        candidates: &'a [C],
        timeout: Duration,
        every: Duration,
        mut heartbeat: H,
        mut probe: F,
    ) -> Result<&'a C, TimedOut>
    where
        F: FnMut(&'a C) -> Fut,
        Fut: Future<Output = bool>,
        H: FnMut(Duration),
    {
        let start = Instant::now();
        let mut last_beat = start;

        loop {
            if let Some(found) = self.find_any(candidates, &mut probe).await {
                return Ok(found);
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(TimedOut { elapsed });
            }

            if last_beat.elapsed() >= every {
                heartbeat(elapsed);
                last_beat = Instant::now();
            }

            // 最后一次等待不超过剩余时间，保证在 timeout 处再检查一轮
            sleep(self.poll_interval.min(timeout - elapsed)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Debug, PartialEq)]
    enum Cand {
        Never,
        After(Duration),
        Always,
    }

    async fn usable(candidate: &Cand, start: Instant) -> bool {
        match candidate {
            Cand::Never => false,
            Cand::After(t) => start.elapsed() >= *t,
            Cand::Always => true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_candidate_wins_when_first_never_usable() {
        let prober = Prober::default();
        let start = Instant::now();
        let candidates = [Cand::Never, Cand::After(Duration::from_millis(3500))];

        let found = prober
            .await_any(&candidates, Duration::from_secs(10), |c| usable(c, start))
            .await;

        assert_eq!(assert_ok!(found), &candidates[1]);
        assert!(start.elapsed() >= Duration::from_millis(3500));
        assert!(start.elapsed() < Duration::from_millis(3500) + prober.poll_interval());
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_order_is_priority() {
        let prober = Prober::default();
        let start = Instant::now();
        let candidates = [Cand::Never, Cand::Always, Cand::After(Duration::ZERO)];

        let found = prober
            .await_any(&candidates, Duration::from_secs(1), |c| usable(c, start))
            .await;
        assert_eq!(found, Ok(&Cand::Always));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_within_one_poll_interval() {
        let prober = Prober::new(Duration::from_secs(1));
        let start = Instant::now();
        let timeout = Duration::from_millis(4500);

        let result = prober
            .await_any(&[Cand::Never, Cand::Never], timeout, |c| usable(c, start))
            .await;

        let err = assert_err!(result);
        assert!(err.elapsed >= timeout);
        assert!(err.elapsed < timeout + prober.poll_interval());
        assert!(start.elapsed() >= timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_checks_once() {
        let prober = Prober::default();
        let start = Instant::now();
        let calls = Cell::new(0);

        let result = prober
            .await_any(&[Cand::Never], Duration::ZERO, |c| {
                calls.set(calls.get() + 1);
                usable(c, start)
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_is_emitted_while_waiting() {
        let prober = Prober::new(Duration::from_secs(1));
        let start = Instant::now();
        let mut beats = Vec::new();
        let cands = [Cand::After(Duration::from_secs(25))];

        let result = prober
            .await_any_with_heartbeat(
                &cands,
                Duration::from_secs(60),
                Duration::from_secs(10),
                |elapsed| beats.push(elapsed.as_secs()),
                |c| usable(c, start),
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(beats, vec![10, 20]);
    }

    #[tokio::test]
    async fn test_check_any_is_single_pass() {
        let prober = Prober::default();
        let start = Instant::now();
        let calls = Cell::new(0);

        let ready = prober
            .check_any(&[Cand::Never, Cand::After(Duration::from_secs(60))], |c| {
                calls.set(calls.get() + 1);
                usable(c, start)
            })
            .await;

        assert!(!ready);
        assert_eq!(calls.get(), 2);
        assert!(prober.check_any(&[Cand::Always], |c| usable(c, start)).await);
    }
}
