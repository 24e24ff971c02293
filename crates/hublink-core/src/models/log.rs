//! 로그 스트림 모델.
//!
//! NIO 로그 서비스의 LOG_MESSAGE / LOG_HISTORY / LOG_STATS 프레임과
//! 클라이언트 측 보관 링버퍼.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// 로그 타임스탬프 — 서버는 epoch millis 또는 ISO 문자열을 보낸다
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogTimestamp {
    /// epoch millis
    Millis(i64),
    /// ISO-8601 문자열
    Text(String),
}

/// 로그 한 건
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// 서버 측 일련번호
    #[serde(default)]
    pub id: Option<u64>,
    /// 발생 시각
    #[serde(default)]
    pub timestamp: Option<LogTimestamp>,
    /// 레벨 (INFO/WARN/ERROR ...)
    #[serde(default)]
    pub level: Option<String>,
    /// 발생 서비스
    #[serde(default)]
    pub service: Option<String>,
    /// 본문
    #[serde(default)]
    pub message: String,
}

/// 로그 서비스 통계 (LOG_STATS)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    /// 수신한 메시지 수
    #[serde(default)]
    pub messages_received: u64,
    /// 수신한 바이트 수
    #[serde(default)]
    pub bytes_received: u64,
    /// 활성 연결 수
    #[serde(default)]
    pub active_connections: u64,
}

/// 기본 보관 한도 — 원본 뷰어와 동일하게 최근 1000건만 유지
pub const DEFAULT_LOG_CAPACITY: usize = 1_000;

/// 클라이언트 측 로그 링버퍼.
///
/// 한도를 넘으면 가장 오래된 항목부터 버린다.
#[derive(Debug)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    /// 지정된 한도로 생성 (0이면 기본 한도 적용)
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_LOG_CAPACITY
        } else {
            capacity
        };
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// 한 건 추가 — 한도 초과 시 앞에서 제거
    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// 히스토리를 통째로 교체 (LOG_HISTORY 수신 시)
    pub fn replace(&mut self, logs: Vec<LogEntry>) {
        self.entries.clear();
        for entry in logs {
            self.push(entry);
        }
    }

    /// 전부 비우기 (CLEAR_LOGS 수신 시)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 보관 중인 항목 수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 오래된 것부터 순회
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
