//! 세션 상태 모델.
//!
//! 하나의 논리 연결이 거치는 상태와 호출자가 관찰하는 스냅샷.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 연결 상태
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    /// 연결 안 됨 (초기 상태 또는 명시적 종료 후)
    Disconnected,
    /// 연결 수립 중
    Connecting,
    /// 연결됨
    Connected,
    /// 재연결 시도 중
    Reconnecting,
    /// 재연결 한도 초과 — 호출자가 다시 connect 해야 복구
    Failed,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Reconnecting => "Reconnecting",
            ConnectionStatus::Failed => "Failed",
        };
        write!(f, "{name}")
    }
}

/// 호출자에게 보여주는 세션 스냅샷.
///
/// 상태 플래그와 마지막 에러는 항상 관찰 가능해야 한다 —
/// 어떤 에러도 조용히 치명적이어서는 안 된다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// 현재 연결 상태
    pub status: ConnectionStatus,
    /// 현재 재연결 시도 횟수 (성공 시 0으로 리셋)
    pub reconnect_attempt: u32,
    /// 마지막 에러 메시지
    pub last_error: Option<String>,
    /// 스냅샷 시각
    pub taken_at: DateTime<Utc>,
}
