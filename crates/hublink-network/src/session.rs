//! 회복형 세션 클라이언트.
//!
//! 하나의 논리 연결을 소유하고, 원시 트랜스포트 이벤트를 타입드 메시지
//! 스트림으로 바꾸며, 상한 있는 지수 백오프로 비계획 종료를 투명하게
//! 복구한다. 호출자는 재시도 로직을 다시 만들 필요가 없다.
//!
//! 동시성 모델: 연결 세대(generation)마다 tokio 태스크 하나.
//! `disconnect()`가 유일한 취소 지점이며 세대 카운터를 올려
//! 대기 중인 재연결 타이머와 늦게 도착한 이벤트를 모두 무효화한다.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use hublink_core::config::{HubConfig, SessionTuning};
use hublink_core::error::{CoreError, SendError};
use hublink_core::models::message::{Envelope, Inbound, Outbound};
use hublink_core::models::role::Role;
use hublink_core::models::session::{ConnectionStatus, SessionSnapshot};
use hublink_core::ports::transport::{Transport, TransportEvent, TransportSink};

use crate::backoff::BackoffPolicy;
use crate::router::MessageRouter;
use crate::ws_transport::WsTransport;

/// 회복형 세션 클라이언트.
///
/// 복제는 싸다 — 같은 세션을 가리키는 핸들이 늘어날 뿐이다.
#[derive(Clone)]
pub struct SessionClient {
    core: Arc<SessionCore>,
}

struct SessionCore {
    url: String,
    role: Role,
    tuning: SessionTuning,
    backoff: BackoffPolicy,
    transport: Arc<dyn Transport>,
    router: Arc<MessageRouter>,

    /// 연결 세대 — connect/disconnect마다 증가, 이전 세대의 지연 콜백 무효화
    generation: AtomicU64,
    /// 명시적 disconnect 전까지만 true
    should_reconnect: AtomicBool,
    /// 현재 재연결 시도 횟수 (성공 시 0)
    reconnect_attempt: AtomicU32,
    /// 현재 세대의 송신기 — 세션이 독점 소유
    sink: tokio::sync::Mutex<Option<(u64, Box<dyn TransportSink>)>>,
    /// 상태 브로드캐스트
    status_tx: watch::Sender<ConnectionStatus>,
    status_rx: watch::Receiver<ConnectionStatus>,
    /// 마지막 에러 (참고용 — 호출자가 항상 관찰 가능)
    last_error: Mutex<Option<String>>,
}

impl SessionClient {
    /// Hub 설정으로 세션 생성 (실제 WebSocket 트랜스포트)
    pub fn new(hub: &HubConfig, role: Role, tuning: SessionTuning) -> Result<Self, CoreError> {
        Self::with_transport(hub.socket_url(role), role, tuning, Arc::new(WsTransport::new()))
    }

    /// 트랜스포트를 주입해 세션 생성 — 테스트에서 가짜 트랜스포트 사용
    pub fn with_transport(
        url: String,
        role: Role,
        tuning: SessionTuning,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, CoreError> {
        tuning.validate()?;
        let parsed = url::Url::parse(&url)
            .map_err(|e| CoreError::Config(format!("잘못된 세션 URL {url}: {e}")))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(CoreError::Config(format!(
                "지원하지 않는 URL 스킴: {}",
                parsed.scheme()
            )));
        }
        let backoff = BackoffPolicy::from(&tuning);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        Ok(Self {
            core: Arc::new(SessionCore {
                url,
                role,
                tuning,
                backoff,
                transport,
                router: Arc::new(MessageRouter::default()),
                generation: AtomicU64::new(0),
                should_reconnect: AtomicBool::new(false),
                reconnect_attempt: AtomicU32::new(0),
                sink: tokio::sync::Mutex::new(None),
                status_tx,
                status_rx,
                last_error: Mutex::new(None),
            }),
        })
    }

    /// 연결 대상 URL
    pub fn url(&self) -> &str {
        &self.core.url
    }

    /// 타입드 수신 스트림 라우터
    pub fn router(&self) -> &MessageRouter {
        &self.core.router
    }

    /// 현재 연결 상태
    pub fn status(&self) -> ConnectionStatus {
        *self.core.status_rx.borrow()
    }

    /// 상태 변경 수신기 생성
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.core.status_rx.clone()
    }

    /// 마지막 에러 메시지
    pub fn last_error(&self) -> Option<String> {
        self.core.last_error.lock().unwrap().clone()
    }

    /// 호출자용 스냅샷
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status(),
            reconnect_attempt: self.core.reconnect_attempt.load(Ordering::Relaxed),
            last_error: self.last_error(),
            taken_at: chrono::Utc::now(),
        }
    }

    /// 연결 시작.
    ///
    /// 기존 연결이 있으면 먼저 철거하고, 재시도 카운터를 리셋한 뒤
    /// 새 연결 루프를 시작한다. `identity`는 핸드셰이크와 이후 모든
    /// 재연결에 그대로 쓰인다. 빈 identity 검증은 호출자 몫이다.
    pub async fn connect(&self, identity: &str) {
        let core = &self.core;
        // 세대 교체 — 이전 세대의 타이머/이벤트는 전부 무효
        let generation = core.generation.fetch_add(1, Ordering::SeqCst) + 1;
        core.should_reconnect.store(true, Ordering::SeqCst);
        core.reconnect_attempt.store(0, Ordering::SeqCst);
        core.teardown_sink().await;
        core.set_status(ConnectionStatus::Connecting);
        core.set_error(None);

        let core = Arc::clone(&self.core);
        let identity = identity.to_string();
        tokio::spawn(async move {
            core.run(generation, identity).await;
        });
    }

    /// 명시적 연결 종료.
    ///
    /// 이후 어떤 자동 재연결도 일어나지 않는다 — 이미 예약된
    /// 재연결 타이머도 세대 검사에서 무효화된다.
    pub async fn disconnect(&self) {
        let core = &self.core;
        core.should_reconnect.store(false, Ordering::SeqCst);
        core.generation.fetch_add(1, Ordering::SeqCst);
        core.teardown_sink().await;
        core.reconnect_attempt.store(0, Ordering::SeqCst);
        core.set_status(ConnectionStatus::Disconnected);
        info!(role = %core.role, "세션 종료");
    }

    /// 메시지 전송.
    ///
    /// 연결되지 않았으면 [`SendError::NotConnected`]를 동기적으로 돌려준다.
    /// 전송 실패는 연결을 닫지 않는다.
    pub async fn send(&self, msg: &Outbound) -> Result<(), SendError> {
        if self.status() != ConnectionStatus::Connected {
            return Err(SendError::NotConnected);
        }
        let text = serde_json::to_string(msg).map_err(|e| SendError::Failed(e.to_string()))?;
        self.core.send_text(&text).await
    }
}

impl SessionCore {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn reconnect_wanted(&self) -> bool {
        self.should_reconnect.load(Ordering::SeqCst)
    }

    fn set_status(&self, status: ConnectionStatus) {
        let _ = self.status_tx.send(status);
    }

    fn set_error(&self, error: Option<String>) {
        *self.last_error.lock().unwrap() = error;
    }

    /// 현재 송신기를 베스트에포트로 닫는다. 닫기 에러는 삼키고 로그만 남긴다.
    async fn teardown_sink(&self) {
        let taken = self.sink.lock().await.take();
        if let Some((_, sink)) = taken {
            if let Err(e) = sink.close().await {
                warn!("기존 연결 종료 중 에러 (무시): {e}");
            }
        }
    }

    async fn send_text(&self, text: &str) -> Result<(), SendError> {
        let guard = self.sink.lock().await;
        match guard.as_ref() {
            Some((_, sink)) => sink
                .send_text(text)
                .await
                .map_err(|e| SendError::Failed(e.to_string())),
            None => Err(SendError::NotConnected),
        }
    }

    /// 연결 루프 — 한 세대 동안 open → pump → (비계획 종료 시) 백오프 재시도
    async fn run(self: Arc<Self>, generation: u64, identity: String) {
        loop {
            if !self.is_current(generation) {
                return;
            }

            match self.transport.connect(&self.url).await {
                Ok(handle) => {
                    if !self.is_current(generation) {
                        // connect 도중 disconnect/재connect가 끼어든 경우
                        if let Err(e) = handle.sink.close().await {
                            debug!("낡은 연결 정리 중 에러 (무시): {e}");
                        }
                        return;
                    }

                    info!(role = %self.role, url = %self.url, "연결 수립");
                    *self.sink.lock().await = Some((generation, handle.sink));
                    self.reconnect_attempt.store(0, Ordering::SeqCst);
                    self.set_error(None);
                    self.set_status(ConnectionStatus::Connected);

                    // 역할별 핸드셰이크
                    if let Some(envelope) = self.role.handshake(&identity) {
                        if let Err(e) = self.send_envelope(&envelope).await {
                            warn!("핸드셰이크 전송 실패: {e}");
                            self.set_error(Some(format!("핸드셰이크 전송 실패: {e}")));
                        }
                    }

                    self.pump(generation, handle.events).await;

                    // 이 세대의 송신기만 회수한다
                    {
                        let mut guard = self.sink.lock().await;
                        if matches!(guard.as_ref(), Some((g, _)) if *g == generation) {
                            *guard = None;
                        }
                    }
                }
                Err(e) => {
                    warn!(role = %self.role, "연결 실패: {e}");
                    self.set_error(Some(e.to_string()));
                }
            }

            if !self.is_current(generation) || !self.reconnect_wanted() {
                // 명시적 종료가 이겼다 — 재시도 예약 없음
                return;
            }

            // 비계획 종료: 재연결 스케줄
            let attempt = self.reconnect_attempt.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt > self.tuning.max_reconnect_attempts {
                warn!(role = %self.role, "최대 재연결 횟수 도달 — 포기");
                self.set_error(Some("최대 재연결 횟수 도달".to_string()));
                self.set_status(ConnectionStatus::Failed);
                return;
            }

            self.set_status(ConnectionStatus::Reconnecting);
            let delay = self.backoff.delay(attempt);
            info!(
                role = %self.role,
                attempt,
                max = self.tuning.max_reconnect_attempts,
                delay_ms = delay.as_millis() as u64,
                "재연결 대기"
            );
            tokio::time::sleep(delay).await;

            if !self.is_current(generation) || !self.reconnect_wanted() {
                // 잠든 사이 disconnect가 호출됨
                return;
            }
        }
    }

    /// 연결된 동안의 이벤트 루프.
    ///
    /// 하트비트 티커는 이 루프 안에만 존재하므로 연결보다 오래 살 수 없다.
    async fn pump(
        &self,
        generation: u64,
        mut events: tokio::sync::mpsc::Receiver<TransportEvent>,
    ) {
        let mut heartbeat = if self.role.wants_heartbeat() {
            let period = Duration::from_millis(self.tuning.heartbeat_interval_ms);
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            Some(ticker)
        } else {
            None
        };

        loop {
            tokio::select! {
                event = events.recv() => {
                    if !self.is_current(generation) {
                        return;
                    }
                    match event {
                        Some(TransportEvent::Text(text)) => self.handle_text(&text),
                        Some(TransportEvent::Error(e)) => {
                            // 참고용 — 상태 전이는 close 이벤트만 일으킨다
                            warn!(role = %self.role, "트랜스포트 에러: {e}");
                            self.set_error(Some(e));
                        }
                        Some(TransportEvent::Closed { code, reason }) => {
                            info!(role = %self.role, ?code, ?reason, "연결 종료됨");
                            self.set_status(ConnectionStatus::Disconnected);
                            return;
                        }
                        None => {
                            info!(role = %self.role, "트랜스포트 스트림 종료");
                            self.set_status(ConnectionStatus::Disconnected);
                            return;
                        }
                    }
                }
                _ = async {
                    match heartbeat.as_mut() {
                        Some(ticker) => { ticker.tick().await; }
                        None => std::future::pending().await,
                    }
                } => {
                    if !self.is_current(generation) {
                        return;
                    }
                    if let Err(e) = self.send_envelope(&Envelope::Ping).await {
                        // 치명적이지 않다 — 다음 주기에 다시 시도
                        warn!(role = %self.role, "하트비트 전송 실패: {e}");
                    } else {
                        debug!(role = %self.role, "하트비트 전송");
                    }
                }
            }
        }
    }

    /// 텍스트 프레임 한 건 처리 — 잘못된 JSON은 버리고 연결은 유지
    fn handle_text(&self, text: &str) {
        match Inbound::parse(text) {
            Ok(msg) => {
                if msg == Inbound::Pong {
                    debug!(role = %self.role, "PONG 수신");
                }
                self.router.publish(msg);
            }
            Err(e) => {
                warn!(role = %self.role, "잘못된 프레임 무시: {e}");
            }
        }
    }

    async fn send_envelope(&self, envelope: &Envelope) -> Result<(), SendError> {
        let text = serde_json::to_string(envelope).map_err(|e| SendError::Failed(e.to_string()))?;
        self.send_text(&text).await
    }
}
