//! 테스트 공용 가짜 트랜스포트.
//!
//! `Transport` 포트의 인메모리 구현. 각 connect 호출의 성패를
//! 대본(script)으로 지정하고, 수립된 연결마다 서버 측 제어 핸들
//! ([`MockLink`])을 노출한다.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use hublink_core::error::CoreError;
use hublink_core::ports::transport::{Transport, TransportEvent, TransportHandle, TransportSink};

/// connect 호출 하나의 대본
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// 연결 수립
    Accept,
    /// 연결 거부 (Network 에러)
    Refuse,
}

/// 수립된 연결 하나의 서버 측 핸들
pub struct MockLink {
    /// 연결된 URL
    pub url: String,
    /// 연결 수립 시각 (가상 시간)
    pub connected_at: Instant,
    /// 서버 → 클라이언트 이벤트 주입구
    pub events_tx: mpsc::Sender<TransportEvent>,
    /// 클라이언트가 sink.close()를 호출했는지
    pub closed: Arc<AtomicBool>,
    sent_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
}

impl MockLink {
    /// 클라이언트가 보낸 다음 텍스트 프레임 (가상 시간 한도 내)
    pub async fn next_sent(&self, limit: Duration) -> Option<String> {
        let mut rx = self.sent_rx.lock().await;
        tokio::time::timeout(limit, rx.recv()).await.ok().flatten()
    }

    /// 지금까지 도착해 있는 프레임만 회수 (대기 없음)
    pub async fn drain_sent(&self) -> Vec<String> {
        let mut rx = self.sent_rx.lock().await;
        let mut out = Vec::new();
        while let Ok(text) = rx.try_recv() {
            out.push(text);
        }
        out
    }

    /// 서버 측에서 텍스트 프레임 주입
    pub async fn push_text(&self, text: &str) {
        self.events_tx
            .send(TransportEvent::Text(text.to_string()))
            .await
            .expect("이벤트 채널 닫힘");
    }

    /// 서버 측에서 비계획 종료 주입
    pub async fn push_close(&self, code: u16) {
        self.events_tx
            .send(TransportEvent::Closed {
                code: Some(code),
                reason: None,
            })
            .await
            .expect("이벤트 채널 닫힘");
    }

    /// 서버 측에서 에러 이벤트 주입 (참고용 — 연결 유지)
    pub async fn push_error(&self, message: &str) {
        self.events_tx
            .send(TransportEvent::Error(message.to_string()))
            .await
            .expect("이벤트 채널 닫힘");
    }
}

/// 대본 기반 가짜 트랜스포트
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<ConnectOutcome>>,
    links: Mutex<Vec<Arc<MockLink>>>,
    connect_times: Mutex<Vec<Instant>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 다음 connect 호출들의 결과를 순서대로 지정 (소진되면 Accept)
    pub fn script(&self, outcomes: &[ConnectOutcome]) {
        self.script.lock().unwrap().extend(outcomes.iter().copied());
    }

    /// 지금까지의 connect 호출 횟수
    pub fn connect_count(&self) -> usize {
        self.connect_times.lock().unwrap().len()
    }

    /// 각 connect 호출 시각 (가상 시간)
    pub fn connect_times(&self) -> Vec<Instant> {
        self.connect_times.lock().unwrap().clone()
    }

    /// n번째로 수립된 연결의 핸들
    pub fn link(&self, index: usize) -> Arc<MockLink> {
        Arc::clone(&self.links.lock().unwrap()[index])
    }

    /// 수립된 연결 수
    pub fn link_count(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    /// index번째 연결이 생길 때까지 대기 (가상 시간 한도 내)
    pub async fn wait_for_link(&self, index: usize, limit: Duration) -> Arc<MockLink> {
        let deadline = Instant::now() + limit;
        loop {
            if self.link_count() > index {
                return self.link(index);
            }
            assert!(Instant::now() < deadline, "연결 {index} 대기 시간 초과");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &str) -> Result<TransportHandle, CoreError> {
        self.connect_times.lock().unwrap().push(Instant::now());

        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ConnectOutcome::Accept);
        if outcome == ConnectOutcome::Refuse {
            return Err(CoreError::Network("연결 거부 (대본)".into()));
        }

        let (events_tx, events_rx) = mpsc::channel(64);
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let link = Arc::new(MockLink {
            url: url.to_string(),
            connected_at: Instant::now(),
            events_tx,
            closed: Arc::clone(&closed),
            sent_rx: tokio::sync::Mutex::new(sent_rx),
        });
        self.links.lock().unwrap().push(link);

        Ok(TransportHandle {
            sink: Box::new(MockSink { sent_tx, closed }),
            events: events_rx,
        })
    }
}

struct MockSink {
    sent_tx: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl TransportSink for MockSink {
    async fn send_text(&self, text: &str) -> Result<(), CoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CoreError::Network("닫힌 연결에 전송".into()));
        }
        self.sent_tx
            .send(text.to_string())
            .map_err(|_| CoreError::Network("가짜 연결 수신측 종료".into()))
    }

    async fn close(&self) -> Result<(), CoreError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
