//! 타이핑 표시 하위 프로토콜 (채팅 역할 전용).
//!
//! 디바운스 상태 기계: Idle → `TYPING` 전송 + 3초 타이머 → (만료 또는
//! 실제 메시지 전송 시) `STOP_TYPING` → Idle. 창 안의 추가 키 입력은
//! 타이머만 연장하고 `TYPING`을 중복 전송하지 않는다.
//!
//! 세션 핵심 계약의 일부가 아니라 그 위에 얹힌 레이어다.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use hublink_core::models::message::{Envelope, Outbound};

use crate::session::SessionClient;

/// 디바운스 상태 기계가 내보내는 신호
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    /// `TYPING` 전송 필요
    Start,
    /// `STOP_TYPING` 전송 필요
    Stop,
}

/// 순수 디바운스 상태 기계 — 타이머는 바깥에서 돌린다
#[derive(Debug)]
pub struct TypingGate {
    window: Duration,
    deadline: Option<Instant>,
}

impl TypingGate {
    /// 지정된 디바운스 창으로 생성
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// 키 입력 — Idle이면 Start 신호, 이미 타이핑 중이면 창만 연장
    pub fn on_keystroke(&mut self, now: Instant) -> Option<TypingSignal> {
        let was_idle = self.deadline.is_none();
        self.deadline = Some(now + self.window);
        was_idle.then_some(TypingSignal::Start)
    }

    /// 실제 메시지 전송/포커스 이탈 — 타이핑 중이었다면 Stop 신호
    pub fn on_message_sent(&mut self) -> Option<TypingSignal> {
        self.deadline.take().map(|_| TypingSignal::Stop)
    }

    /// 타이머 만료 — 기한이 지났다면 Stop 신호
    pub fn on_deadline_elapsed(&mut self, now: Instant) -> Option<TypingSignal> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                Some(TypingSignal::Stop)
            }
            _ => None,
        }
    }

    /// 현재 걸려 있는 기한
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// 세션 위에서 타이핑 신호를 실제로 전송하는 드라이버.
///
/// 전송 실패는 로그만 남긴다 — 타이핑 표시는 베스트에포트다.
pub struct TypingNotifier {
    session: SessionClient,
    window: Duration,
    gate: Arc<Mutex<TypingGate>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl TypingNotifier {
    /// 세션과 디바운스 창으로 생성
    pub fn new(session: SessionClient, window: Duration) -> Self {
        Self {
            session,
            window,
            gate: Arc::new(Mutex::new(TypingGate::new(window))),
            timer: Mutex::new(None),
        }
    }

    /// 키 입력 통지
    pub async fn keystroke(&self) {
        let signal = self.gate.lock().unwrap().on_keystroke(Instant::now());
        if signal == Some(TypingSignal::Start) {
            send_typing(&self.session, true).await;
        }
        self.rearm_timer();
    }

    /// 메시지 전송 직후 호출 — 즉시 STOP_TYPING, 타이머 취소
    pub async fn message_sent(&self) {
        self.cancel_timer();
        let signal = self.gate.lock().unwrap().on_message_sent();
        if signal == Some(TypingSignal::Stop) {
            send_typing(&self.session, false).await;
        }
    }

    /// 철거 — 타이머만 끊는다 (STOP_TYPING 전송 없음)
    pub fn cancel(&self) {
        self.cancel_timer();
        self.gate.lock().unwrap().deadline = None;
    }

    fn cancel_timer(&self) {
        if let Some(handle) = self.timer.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// 기한 타이머 재장전 — 키 입력마다 기존 타이머를 버리고 새로 건다
    fn rearm_timer(&self) {
        self.cancel_timer();
        let gate = Arc::clone(&self.gate);
        let session = self.session.clone();
        let window = self.window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let signal = gate.lock().unwrap().on_deadline_elapsed(Instant::now());
            if signal == Some(TypingSignal::Stop) {
                send_typing(&session, false).await;
            }
        });
        *self.timer.lock().unwrap() = Some(handle);
    }
}

impl Drop for TypingNotifier {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// 타이핑 신호 전송 — 실패해도 로그만 남긴다
async fn send_typing(session: &SessionClient, start: bool) {
    let envelope = if start {
        Envelope::typing()
    } else {
        Envelope::stop_typing()
    };
    match session.send(&Outbound::from(envelope)).await {
        Ok(()) => debug!(start, "타이핑 신호 전송"),
        Err(e) => warn!("타이핑 신호 전송 실패: {e}"),
    }
}
