//! 도메인 데이터 구조체.
//!
//! 모두 serde Serialize/Deserialize를 구현하며 와이어 형태를 그대로 따른다.

pub mod log;
pub mod message;
pub mod role;
pub mod service;
pub mod session;
