//! 서비스 레지스트리 모델.
//!
//! SERVICE_REGISTRY_UPDATE 스냅샷에 담기는 서비스 항목.
//! 와이어 필드는 camelCase.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 등록된 서비스의 상태
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// 정상 동작
    Online,
    /// 등록 해제됨
    Offline,
    /// 하트비트 누락
    Timeout,
    /// 알 수 없는 상태 문자열
    #[serde(other)]
    #[default]
    Unknown,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServiceStatus::Online => "online",
            ServiceStatus::Offline => "offline",
            ServiceStatus::Timeout => "timeout",
            ServiceStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// 레지스트리에 등록된 서비스 한 건
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    /// 서비스 이름
    pub name: String,
    /// 현재 상태
    #[serde(default)]
    pub status: ServiceStatus,
    /// 호스트
    #[serde(default)]
    pub host: Option<String>,
    /// 포트
    #[serde(default)]
    pub port: Option<u16>,
    /// 마지막 하트비트 (epoch millis)
    #[serde(default)]
    pub last_heartbeat: Option<i64>,
    /// 최초 등록 시각 (epoch millis)
    #[serde(default)]
    pub registration_time: Option<i64>,
    /// 서비스가 신고한 메타데이터
    #[serde(default)]
    pub metadata: Option<ServiceMetadata>,
}

/// 서비스 메타데이터 — 고정 필드 외에는 그대로 보존
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetadata {
    /// 서비스 종류
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// 버전
    #[serde(default)]
    pub version: Option<String>,
    /// CPU 부하 (%)
    #[serde(default)]
    pub cpu_load: Option<f64>,
    /// 그 밖의 필드
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
