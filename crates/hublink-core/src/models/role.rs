//! 연결 역할(Role) 모델.
//!
//! 역할이 엔드포인트 경로/포트와 하위 프로토콜(핸드셰이크, 하트비트)을 결정한다.

use serde::{Deserialize, Serialize};

use crate::models::message::Envelope;

/// 논리 연결의 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// 채팅방 (`/chat`) — JOIN 핸드셰이크, 타이핑 표시 하위 프로토콜
    Chat,
    /// 서비스 레지스트리 대시보드 (`/registry`) — DASHBOARD_CONNECT + 25초 PING
    Registry,
    /// NIO 로그 스트림 (`/logs`) — 접속 즉시 FETCH_LOGS
    LogStream,
    /// API 게이트웨이 (`/api`) — `{command, ...}` 명령 객체
    ApiGateway,
}

impl Role {
    /// 소켓 경로
    pub fn path(&self) -> &'static str {
        match self {
            Role::Chat => "/chat",
            Role::Registry => "/registry",
            Role::LogStream => "/logs",
            Role::ApiGateway => "/api",
        }
    }

    /// 역할별 기본 포트.
    ///
    /// TLS 연결 시 채팅/레지스트리는 Hub의 공용 SSL 커넥터(7443)를 쓴다.
    /// 로그/게이트웨이 서비스는 평문 포트만 노출한다.
    pub fn default_port(&self, use_tls: bool) -> u16 {
        match (self, use_tls) {
            (Role::Chat, true) | (Role::Registry, true) => 7443,
            (Role::Chat, false) => 7070,
            (Role::Registry, false) => 7071,
            (Role::LogStream, _) => 9092,
            (Role::ApiGateway, _) => 9001,
        }
    }

    /// 이 역할이 주기적 하트비트(PING)를 요구하는지 여부
    pub fn wants_heartbeat(&self) -> bool {
        matches!(self, Role::Registry)
    }

    /// 연결 수립 직후 보낼 핸드셰이크 메시지
    pub fn handshake(&self, identity: &str) -> Option<Envelope> {
        match self {
            Role::Chat => Some(Envelope::join(identity)),
            Role::Registry => Some(Envelope::dashboard_connect(identity)),
            Role::LogStream => Some(Envelope::FetchLogs),
            Role::ApiGateway => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Chat => "chat",
            Role::Registry => "registry",
            Role::LogStream => "log_stream",
            Role::ApiGateway => "api_gateway",
        };
        write!(f, "{name}")
    }
}
