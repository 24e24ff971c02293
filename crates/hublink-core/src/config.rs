//! 애플리케이션 설정 구조체.
//!
//! Hub 호스트/포트, TLS 플래그, 세션 튜닝(재연결 한도, 백오프, 하트비트,
//! 타이핑 디바운스)을 정의한다. 전부 파일/생성자에서 주입 가능하며
//! 하드코딩하지 않는다.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::role::Role;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hub 엔드포인트 설정
    #[serde(default)]
    pub hub: HubConfig,
    /// 세션 동작 튜닝
    #[serde(default)]
    pub session: SessionTuning,
}

impl AppConfig {
    /// 기본 설정 생성
    pub fn default_config() -> Self {
        Self::default()
    }
}

/// Hub 엔드포인트 설정.
///
/// 보안 플래그는 스킴(ws/wss)과 포트를 함께 바꾼다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Hub 호스트
    #[serde(default = "default_host")]
    pub host: String,
    /// TLS 사용 여부 (wss + SSL 커넥터 포트)
    #[serde(default)]
    pub use_tls: bool,
    /// 역할별 포트 재정의 — 비워두면 역할 기본값 사용
    #[serde(default)]
    pub port_overrides: PortOverrides,
}

fn default_host() -> String {
    "localhost".to_string()
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            use_tls: false,
            port_overrides: PortOverrides::default(),
        }
    }
}

/// 역할별 포트 재정의
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortOverrides {
    /// 채팅 포트
    #[serde(default)]
    pub chat: Option<u16>,
    /// 레지스트리 포트
    #[serde(default)]
    pub registry: Option<u16>,
    /// 로그 스트림 포트
    #[serde(default)]
    pub log_stream: Option<u16>,
    /// API 게이트웨이 포트
    #[serde(default)]
    pub api_gateway: Option<u16>,
}

impl HubConfig {
    /// 역할에 적용되는 포트
    pub fn port(&self, role: Role) -> u16 {
        let explicit = match role {
            Role::Chat => self.port_overrides.chat,
            Role::Registry => self.port_overrides.registry,
            Role::LogStream => self.port_overrides.log_stream,
            Role::ApiGateway => self.port_overrides.api_gateway,
        };
        explicit.unwrap_or_else(|| role.default_port(self.use_tls))
    }

    /// 역할의 소켓 URL (`ws://host:port/path` 또는 `wss://...`)
    pub fn socket_url(&self, role: Role) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!(
            "{scheme}://{}:{}{}",
            self.host,
            self.port(role),
            role.path()
        )
    }

    /// 채팅 옆의 HTTP 파일 업로드 사이드 채널 URL.
    ///
    /// 소켓과 같은 서버가 `/upload` 멀티파트 엔드포인트를 함께 노출한다.
    pub fn upload_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{scheme}://{}:{}/upload", self.host, self.port(Role::Chat))
    }
}

/// 세션 동작 튜닝.
///
/// 기본값은 Hub 대시보드 계열과 동일: 6회 재시도,
/// 1초 기점 / 30초 상한 지수 백오프, 25초 하트비트, 3초 타이핑 창.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTuning {
    /// 최대 재연결 시도 횟수 — 초과 시 Failed로 전이
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// 백오프 기점 (밀리초)
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// 백오프 상한 (밀리초)
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
    /// 하트비트 주기 (밀리초)
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// 타이핑 표시 디바운스 창 (밀리초)
    #[serde(default = "default_typing_window_ms")]
    pub typing_window_ms: u64,
}

fn default_max_reconnect_attempts() -> u32 {
    6
}
fn default_backoff_base_ms() -> u64 {
    1_000
}
fn default_backoff_cap_ms() -> u64 {
    30_000
}
fn default_heartbeat_interval_ms() -> u64 {
    25_000
}
fn default_typing_window_ms() -> u64 {
    3_000
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: default_max_reconnect_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            typing_window_ms: default_typing_window_ms(),
        }
    }
}

impl SessionTuning {
    /// 생성 시점 유효성 검증.
    ///
    /// 잘못된 설정은 프로그래머 에러이므로 여기서만 하드하게 실패한다.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.backoff_base_ms == 0 {
            return Err(CoreError::Config("backoff_base_ms는 0일 수 없음".into()));
        }
        if self.backoff_cap_ms < self.backoff_base_ms {
            return Err(CoreError::Config(
                "backoff_cap_ms가 backoff_base_ms보다 작음".into(),
            ));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(CoreError::Config(
                "heartbeat_interval_ms는 0일 수 없음".into(),
            ));
        }
        if self.typing_window_ms == 0 {
            return Err(CoreError::Config("typing_window_ms는 0일 수 없음".into()));
        }
        Ok(())
    }
}
