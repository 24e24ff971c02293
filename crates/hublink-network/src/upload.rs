//! HTTP 파일 업로드 사이드 채널.
//!
//! 소켓 채널 옆에 존재하는 단순 요청/응답 엔드포인트:
//! `POST /upload` 멀티파트 폼 (`username` + `file` 필드),
//! 사용자명으로 소켓 세션과 연관된다.

use std::time::Duration;

use tracing::{debug, warn};

use hublink_core::error::CoreError;

/// 기본 요청 타임아웃
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// 멀티파트 파일 업로드 클라이언트
pub struct FileUploadClient {
    client: reqwest::Client,
    upload_url: String,
}

impl FileUploadClient {
    /// 업로드 URL로 클라이언트 생성
    pub fn new(upload_url: &str) -> Result<Self, CoreError> {
        Self::with_timeout(upload_url, DEFAULT_TIMEOUT)
    }

    /// 타임아웃을 지정해 생성
    pub fn with_timeout(upload_url: &str, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;
        Ok(Self {
            client,
            upload_url: upload_url.to_string(),
        })
    }

    /// 파일 한 건 업로드.
    ///
    /// 실패는 에러 값으로만 보고된다 — 소켓 세션 상태와는 무관하다.
    pub async fn upload(
        &self,
        username: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), CoreError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("username", username.to_string())
            .part("file", part);

        debug!(username, file_name, "파일 업로드 시작");

        let resp = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("업로드 요청 실패: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|e| {
                warn!("업로드 응답 본문 읽기 실패: {e}");
                String::new()
            });
            return Err(CoreError::Network(format!(
                "업로드 거부됨 ({status}): {body}"
            )));
        }

        debug!(file_name, "파일 업로드 완료");
        Ok(())
    }
}
