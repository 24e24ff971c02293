//! 타입드 메시지 라우터.
//!
//! `tokio::broadcast` 기반. 구독자는 와이어 태그별로 등록하고 해당 태그의
//! 메시지만 받는다 — 전역 이벤트 버스로 한 소켓의 메시지를 아무 탭에나
//! 흘리는 대신, 명시적 구독/해지(수신기 drop)로 팬아웃한다.

use std::collections::HashMap;
use std::sync::Mutex;

use hublink_core::models::message::Inbound;
use tokio::sync::broadcast;
use tracing::trace;

/// 기본 채널 용량
const DEFAULT_CAPACITY: usize = 128;

/// 수신 메시지 팬아웃 라우터
pub struct MessageRouter {
    /// 태그 무관 전체 스트림
    all_tx: broadcast::Sender<Inbound>,
    /// 태그별 채널 — 구독자가 전부 떠나면 publish 시 정리
    by_kind: Mutex<HashMap<String, broadcast::Sender<Inbound>>>,
    capacity: usize,
}

impl MessageRouter {
    /// 지정된 채널 용량으로 생성
    pub fn new(capacity: usize) -> Self {
        let (all_tx, _) = broadcast::channel(capacity);
        Self {
            all_tx,
            by_kind: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// 특정 와이어 태그 구독 (예: `"USER_LIST_UPDATE"`).
    ///
    /// 해지는 수신기를 drop하면 된다.
    pub fn subscribe(&self, kind: &str) -> broadcast::Receiver<Inbound> {
        let mut by_kind = self.by_kind.lock().unwrap();
        by_kind
            .entry(kind.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// 모든 메시지 구독
    pub fn subscribe_all(&self) -> broadcast::Receiver<Inbound> {
        self.all_tx.subscribe()
    }

    /// 메시지 발행 — 태그 채널과 전체 채널 양쪽으로
    pub fn publish(&self, msg: Inbound) {
        trace!("메시지 라우팅: {}", msg.kind());

        {
            let mut by_kind = self.by_kind.lock().unwrap();
            if let Some(tx) = by_kind.get(msg.kind()) {
                if tx.receiver_count() == 0 {
                    // 마지막 구독자가 떠난 채널은 버린다
                    by_kind.remove(msg.kind());
                } else {
                    let _ = tx.send(msg.clone());
                }
            }
        }

        let _ = self.all_tx.send(msg);
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
