//! # hublink-network
//!
//! Hub 네트워크 어댑터: 회복형 WebSocket 세션 클라이언트와
//! HTTP 멀티파트 업로드 사이드 채널.
//!
//! 핵심은 [`session::SessionClient`] — 논리 연결 하나를 소유하고
//! connect/disconnect/send와 타입드 수신 스트림을 제공하며,
//! 재연결(상한 있는 지수 백오프)과 하트비트를 내부에서 처리한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use hublink_core::config::{HubConfig, SessionTuning};
//! use hublink_core::models::role::Role;
//! use hublink_network::session::SessionClient;
//!
//! let session = SessionClient::new(&HubConfig::default(), Role::Chat, SessionTuning::default())?;
//! let mut users = session.router().subscribe("USER_LIST_UPDATE");
//! session.connect("alice").await;
//! ```

pub mod backoff;
pub mod router;
pub mod session;
pub mod typing;
pub mod upload;
pub mod ws_transport;
