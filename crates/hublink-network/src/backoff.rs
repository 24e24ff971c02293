//! 재연결 백오프 정책.
//!
//! 상한 있는 지수 백오프: `min(cap, base * 2^(attempt-1))`.
//! 기본값(1초/30초)이면 1s, 2s, 4s, 8s, 16s, 30s 순서.

use std::time::Duration;

use hublink_core::config::SessionTuning;

/// 상한 있는 지수 백오프
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
}

impl BackoffPolicy {
    /// 기점/상한으로 생성
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// n번째 시도(1부터)의 대기 시간
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63);
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let millis = (self.base.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(millis).min(self.cap)
    }
}

impl From<&SessionTuning> for BackoffPolicy {
    fn from(tuning: &SessionTuning) -> Self {
        Self::new(
            Duration::from_millis(tuning.backoff_base_ms),
            Duration::from_millis(tuning.backoff_cap_ms),
        )
    }
}
