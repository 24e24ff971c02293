//! HUBLINK 핵심 에러 타입.
//!
//! 어댑터 crate는 외부 라이브러리 에러를 `CoreError`로 매핑한다.
//! 세션 공개 API는 예상 가능한 실패를 절대 panic으로 올리지 않는다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 직렬화, 설정, 네트워크 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류 (생성 시점 검증 실패)
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 — {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 수신 메시지 프레임 해석 실패 (type 누락 등)
    #[error("프로토콜 에러: {0}")]
    Protocol(String),

    /// 네트워크 에러 (연결 실패, 타임아웃)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

/// 세션 `send` 실패.
///
/// 전송 실패는 세션 상태를 바꾸지 않는다 — 연결 종료는
/// close 이벤트만이 주도한다.
#[derive(Debug, Error)]
pub enum SendError {
    /// 연결되지 않은 상태에서 전송 시도
    #[error("연결되지 않음 — 메시지 전송 불가")]
    NotConnected,

    /// 트랜스포트 레벨 전송 실패
    #[error("전송 실패: {0}")]
    Failed(String),
}
