//! 와이어 메시지 모델.
//!
//! Hub 프로토콜은 UTF-8 JSON 객체이며 항상 `type` 문자열 필드를 가진다.
//! 대부분 `payload` 객체를 동반하지만 관리 메시지(PING, FETCH_LOGS 등)와
//! 게이트웨이 응답은 필드를 최상위에 둔다. 게이트웨이 요청만 예외로
//! `{command, ...}` 형태를 쓴다.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::models::log::{LogEntry, LogStats};
use crate::models::service::ServiceInfo;

// ============================================================
// 송신 메시지
// ============================================================

/// 송신 메시지 — 봉투(`{type, payload}`) 또는 게이트웨이 명령(`{command, ...}`)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    /// `{type, payload}` 봉투
    Envelope(Envelope),
    /// 게이트웨이 명령 객체
    Command(GatewayCommand),
}

impl From<Envelope> for Outbound {
    fn from(value: Envelope) -> Self {
        Outbound::Envelope(value)
    }
}

impl From<GatewayCommand> for Outbound {
    fn from(value: GatewayCommand) -> Self {
        Outbound::Command(value)
    }
}

/// `{type, payload}` 봉투 송신 메시지
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Envelope {
    /// 채팅 입장
    Join {
        /// 사용자 식별 페이로드
        payload: IdentityPayload,
    },
    /// 대시보드 접속
    DashboardConnect {
        /// 사용자 식별 페이로드
        payload: IdentityPayload,
    },
    /// 채팅 메시지 전송
    Message {
        /// 본문 페이로드
        payload: TextPayload,
    },
    /// 타이핑 시작 알림
    Typing {
        /// 빈 페이로드 (`{}`)
        payload: EmptyPayload,
    },
    /// 타이핑 중단 알림
    StopTyping {
        /// 빈 페이로드 (`{}`)
        payload: EmptyPayload,
    },
    /// 하트비트 (payload 없음)
    Ping,
    /// 로그 히스토리 요청 (payload 없음)
    FetchLogs,
    /// 로그 비우기 요청 (payload 없음)
    ClearLogs,
}

impl Envelope {
    /// JOIN 봉투 생성
    pub fn join(username: &str) -> Self {
        Envelope::Join {
            payload: IdentityPayload {
                username: username.to_string(),
            },
        }
    }

    /// DASHBOARD_CONNECT 봉투 생성
    pub fn dashboard_connect(username: &str) -> Self {
        Envelope::DashboardConnect {
            payload: IdentityPayload {
                username: username.to_string(),
            },
        }
    }

    /// MESSAGE 봉투 생성
    pub fn message(text: &str) -> Self {
        Envelope::Message {
            payload: TextPayload {
                text: text.to_string(),
            },
        }
    }

    /// TYPING 봉투 생성
    pub fn typing() -> Self {
        Envelope::Typing {
            payload: EmptyPayload {},
        }
    }

    /// STOP_TYPING 봉투 생성
    pub fn stop_typing() -> Self {
        Envelope::StopTyping {
            payload: EmptyPayload {},
        }
    }
}

/// 사용자 식별 페이로드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityPayload {
    /// 사용자명
    pub username: String,
}

/// 텍스트 본문 페이로드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPayload {
    /// 본문
    pub text: String,
}

/// 빈 페이로드 — `{}`로 직렬화
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmptyPayload {}

/// 게이트웨이 명령 — `{command: string, ...args}` 형태 (camelCase)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum GatewayCommand {
    /// 파일 목록 조회
    ListFiles,
    /// 파일 업로드 (내용은 문자열 페이로드)
    #[serde(rename_all = "camelCase")]
    UploadFile {
        /// 파일명
        file_name: String,
        /// 파일 내용
        file_data: String,
    },
    /// 파일 다운로드
    #[serde(rename_all = "camelCase")]
    DownloadFile {
        /// 파일명
        file_name: String,
    },
    /// 외부 날씨 API 조회
    FetchWeather {
        /// 도시명
        city: String,
    },
}

// ============================================================
// 수신 메시지
// ============================================================

/// 채팅 메시지 (MESSAGE / SYSTEM 공용 페이로드)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// 보낸 사용자 (SYSTEM 메시지는 없을 수 있음)
    #[serde(default)]
    pub username: Option<String>,
    /// 본문
    #[serde(default)]
    pub text: String,
    /// 서버 타임스탬프 (epoch millis 또는 ISO 문자열)
    #[serde(default)]
    pub timestamp: Option<Value>,
}

/// 날씨 조회 응답 (게이트웨이, 최상위 필드)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    /// 처리 상태 ("success" 등)
    #[serde(default)]
    pub status: Option<String>,
    /// 기온
    #[serde(default)]
    pub temperature: Option<f64>,
    /// 날씨 상태
    #[serde(default)]
    pub condition: Option<String>,
    /// 습도
    #[serde(default)]
    pub humidity: Option<f64>,
    /// 풍속
    #[serde(default)]
    pub wind_speed: Option<f64>,
}

/// 수신 메시지 — `type` 태그로 구분되는 discriminated union.
///
/// 알 수 없는 태그는 [`Inbound::Unknown`]으로 보존되어 구독자에게
/// 그대로 전달된다. 세션을 죽이는 태그는 존재하지 않는다.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// 접속자 목록 갱신
    UserListUpdate {
        /// 현재 접속자
        users: Vec<String>,
    },
    /// 채팅 메시지
    Chat(ChatMessage),
    /// 시스템 공지 (입장/퇴장 등)
    System(ChatMessage),
    /// 다른 사용자의 타이핑 시작
    Typing {
        /// 타이핑 중인 사용자
        username: Option<String>,
    },
    /// 다른 사용자의 타이핑 중단
    StopTyping {
        /// 타이핑을 멈춘 사용자
        username: Option<String>,
    },
    /// 서버 에러 통지 (채팅은 payload.text, 게이트웨이는 최상위 error)
    Error {
        /// 에러 설명
        text: String,
    },
    /// 서비스 레지스트리 전체 스냅샷 (목록을 통째로 교체)
    ServiceRegistryUpdate {
        /// 등록된 서비스 목록
        services: Vec<ServiceInfo>,
    },
    /// 서비스 온라인 통지 — 주기 스냅샷과 중복이므로 참고용
    ServiceOnline {
        /// 원본 프레임
        raw: Value,
    },
    /// 서비스 오프라인 통지 — 참고용
    ServiceOffline {
        /// 원본 프레임
        raw: Value,
    },
    /// 개별 서비스 실행 결과 (`result_from`으로 출처 구분)
    ServiceResult {
        /// 결과를 낸 서비스 (예: "RMI_SERVICE")
        result_from: String,
        /// 결과 본문
        data: Value,
    },
    /// 하트비트 응답 — 상태 변화 없음
    Pong,
    /// 실시간 로그 한 건
    LogMessage(LogEntry),
    /// 로그 히스토리 일괄
    LogHistory {
        /// 서버가 보고한 건수
        count: u64,
        /// 로그 목록
        logs: Vec<LogEntry>,
    },
    /// 로그 서비스 통계
    LogStats(LogStats),
    /// 로그 비움 통지
    ClearLogs,
    /// 파일 목록 응답
    FileList {
        /// 파일명 목록
        files: Vec<String>,
    },
    /// 파일 업로드 완료
    FileUploadSuccess {
        /// 파일명
        file_name: String,
        /// 서버 메시지
        message: Option<String>,
    },
    /// 파일 다운로드 완료 (내용 포함)
    FileDownloadSuccess {
        /// 파일명
        file_name: String,
        /// 파일 내용
        file_data: String,
    },
    /// 날씨 조회 응답
    WeatherResponse(WeatherReport),
    /// 게이트웨이 서비스 상태 변경 통지
    ServiceStatusUpdate {
        /// 원본 프레임
        raw: Value,
    },
    /// 인식되지 않은 태그 — 버리지 않고 보존
    Unknown {
        /// 와이어 태그
        kind: String,
        /// 원본 프레임
        raw: Value,
    },
}

/// `payload` 객체를 꺼내고, 없으면 최상위 객체를 대신 쓴다.
/// 일부 서비스(게이트웨이, 로그)는 필드를 최상위에 두기 때문.
fn payload_or_root(root: &Value) -> &Value {
    match root.get("payload") {
        Some(p) if p.is_object() => p,
        _ => root,
    }
}

fn opt_string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

impl Inbound {
    /// 원시 텍스트 프레임을 수신 메시지로 해석한다.
    ///
    /// JSON이 아니거나 `type` 필드가 없으면 에러를 돌려준다 — 호출 측은
    /// 이를 로그만 남기고 버린다(연결에는 영향 없음).
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let root: Value = serde_json::from_str(text)?;
        let kind = root
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::Protocol("type 필드 없는 프레임".into()))?
            .to_string();
        Ok(Self::from_value(&kind, root))
    }

    /// 태그가 확인된 JSON 객체를 변환한다.
    ///
    /// 페이로드 형태가 기대와 다르면 해당 태그의 기본값으로 완화해서
    /// 받아들인다 — 형태 불일치로 세션이 죽어서는 안 된다.
    fn from_value(kind: &str, root: Value) -> Self {
        let body = payload_or_root(&root);
        match kind {
            "USER_LIST_UPDATE" => Inbound::UserListUpdate {
                users: body
                    .get("users")
                    .cloned()
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default(),
            },
            "MESSAGE" => Inbound::Chat(
                serde_json::from_value(body.clone()).unwrap_or_else(|_| ChatMessage {
                    username: None,
                    text: String::new(),
                    timestamp: None,
                }),
            ),
            "SYSTEM" => Inbound::System(
                serde_json::from_value(body.clone()).unwrap_or_else(|_| ChatMessage {
                    username: None,
                    text: String::new(),
                    timestamp: None,
                }),
            ),
            "TYPING" => Inbound::Typing {
                username: opt_string(body, "username"),
            },
            "STOP_TYPING" => Inbound::StopTyping {
                username: opt_string(body, "username"),
            },
            "ERROR" => Inbound::Error {
                text: opt_string(body, "text")
                    .or_else(|| opt_string(&root, "error"))
                    .unwrap_or_else(|| "서버 에러".to_string()),
            },
            "SERVICE_REGISTRY_UPDATE" => Inbound::ServiceRegistryUpdate {
                services: body
                    .get("services")
                    .cloned()
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default(),
            },
            "SERVICE_ONLINE" => Inbound::ServiceOnline { raw: root },
            "SERVICE_OFFLINE" => Inbound::ServiceOffline { raw: root },
            "SERVICE_RESULT" => Inbound::ServiceResult {
                result_from: opt_string(&root, "result_from").unwrap_or_default(),
                data: root.get("data").cloned().unwrap_or(Value::Null),
            },
            "PONG" => Inbound::Pong,
            "LOG_MESSAGE" => Inbound::LogMessage(
                root.get("log")
                    .cloned()
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default(),
            ),
            "LOG_HISTORY" => Inbound::LogHistory {
                count: root.get("count").and_then(Value::as_u64).unwrap_or(0),
                logs: root
                    .get("logs")
                    .cloned()
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default(),
            },
            "LOG_STATS" => Inbound::LogStats(
                root.get("stats")
                    .cloned()
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default(),
            ),
            "CLEAR_LOGS" => Inbound::ClearLogs,
            "FILE_LIST" => Inbound::FileList {
                files: root
                    .get("files")
                    .cloned()
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default(),
            },
            "FILE_UPLOAD_SUCCESS" => Inbound::FileUploadSuccess {
                file_name: opt_string(&root, "fileName").unwrap_or_default(),
                message: opt_string(&root, "message"),
            },
            "FILE_DOWNLOAD_SUCCESS" => Inbound::FileDownloadSuccess {
                file_name: opt_string(&root, "fileName").unwrap_or_default(),
                file_data: opt_string(&root, "fileData").unwrap_or_default(),
            },
            "WEATHER_RESPONSE" => Inbound::WeatherResponse(
                serde_json::from_value(root.clone()).unwrap_or_default(),
            ),
            "SERVICE_STATUS_UPDATE" => Inbound::ServiceStatusUpdate { raw: root },
            _ => Inbound::Unknown {
                kind: kind.to_string(),
                raw: root,
            },
        }
    }

    /// 와이어 태그 — 라우터 구독 키로 쓰인다.
    pub fn kind(&self) -> &str {
        match self {
            Inbound::UserListUpdate { .. } => "USER_LIST_UPDATE",
            Inbound::Chat(_) => "MESSAGE",
            Inbound::System(_) => "SYSTEM",
            Inbound::Typing { .. } => "TYPING",
            Inbound::StopTyping { .. } => "STOP_TYPING",
            Inbound::Error { .. } => "ERROR",
            Inbound::ServiceRegistryUpdate { .. } => "SERVICE_REGISTRY_UPDATE",
            Inbound::ServiceOnline { .. } => "SERVICE_ONLINE",
            Inbound::ServiceOffline { .. } => "SERVICE_OFFLINE",
            Inbound::ServiceResult { .. } => "SERVICE_RESULT",
            Inbound::Pong => "PONG",
            Inbound::LogMessage(_) => "LOG_MESSAGE",
            Inbound::LogHistory { .. } => "LOG_HISTORY",
            Inbound::LogStats(_) => "LOG_STATS",
            Inbound::ClearLogs => "CLEAR_LOGS",
            Inbound::FileList { .. } => "FILE_LIST",
            Inbound::FileUploadSuccess { .. } => "FILE_UPLOAD_SUCCESS",
            Inbound::FileDownloadSuccess { .. } => "FILE_DOWNLOAD_SUCCESS",
            Inbound::WeatherResponse(_) => "WEATHER_RESPONSE",
            Inbound::ServiceStatusUpdate { .. } => "SERVICE_STATUS_UPDATE",
            Inbound::Unknown { kind, .. } => kind,
        }
    }
}
