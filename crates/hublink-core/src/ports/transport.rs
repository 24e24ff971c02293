//! 트랜스포트 포트.
//!
//! 구현: `hublink-network` crate (tokio-tungstenite).
//! 세션의 재연결/하트비트 로직은 이 포트만 바라보므로
//! 인메모리 가짜 트랜스포트로 단위 테스트할 수 있다.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CoreError;

/// 트랜스포트에서 올라오는 원시 이벤트.
///
/// 플랫폼 이벤트 순서를 따른다: 에러는 보통 close보다 먼저 오며,
/// 에러 자체는 연결을 닫지 않는다 — 재연결은 close만이 주도한다.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// 텍스트 프레임 수신
    Text(String),
    /// 연결 종료 (계획 여부와 무관)
    Closed {
        /// close 코드 (1006 등)
        code: Option<u16>,
        /// close 사유
        reason: Option<String>,
    },
    /// 트랜스포트 에러 — 참고용, 상태 전이 없음
    Error(String),
}

/// 연결된 트랜스포트 핸들.
///
/// 송신기와 수신 이벤트 스트림의 소유권은 세션이 독점한다.
pub struct TransportHandle {
    /// 송신기
    pub sink: Box<dyn TransportSink>,
    /// 수신 이벤트 — 채널이 닫히면 연결 종료로 본다
    pub events: mpsc::Receiver<TransportEvent>,
}

/// 메시지 지향 양방향 연결을 여는 커넥터
#[async_trait]
pub trait Transport: Send + Sync {
    /// 지정된 URL로 연결 수립
    async fn connect(&self, url: &str) -> Result<TransportHandle, CoreError>;
}

/// 열린 연결의 송신 측
#[async_trait]
pub trait TransportSink: Send + Sync {
    /// 텍스트 프레임 전송
    async fn send_text(&self, text: &str) -> Result<(), CoreError>;

    /// 연결 종료 프레임 전송
    async fn close(&self) -> Result<(), CoreError>;
}
