//! WebSocket 트랜스포트 어댑터.
//!
//! `tokio-tungstenite` 기반 `Transport` 포트 구현.
//! ws:// 와 wss:// (native-tls)를 모두 지원한다.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use hublink_core::error::CoreError;
use hublink_core::ports::transport::{Transport, TransportEvent, TransportHandle, TransportSink};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 수신 이벤트 채널 용량
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// WebSocket 커넥터 — `Transport` 포트 구현
#[derive(Debug, Default)]
pub struct WsTransport;

impl WsTransport {
    /// 새 커넥터 생성
    pub fn new() -> Self {
        Self
    }

    /// 수신 루프 — 프레임을 `TransportEvent`로 변환해 채널로 올린다
    async fn read_loop(mut read: SplitStream<WsStream>, tx: mpsc::Sender<TransportEvent>) {
        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if tx
                        .send(TransportEvent::Text(text.to_string()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Ok(Message::Close(frame)) => {
                    let (code, reason) = match frame {
                        Some(f) => (Some(u16::from(f.code)), Some(f.reason.to_string())),
                        None => (None, None),
                    };
                    let _ = tx.send(TransportEvent::Closed { code, reason }).await;
                    break;
                }
                Ok(Message::Binary(_)) => {
                    // Hub 프로토콜은 텍스트 JSON만 쓴다
                    debug!("바이너리 프레임 무시");
                }
                Ok(_) => {} // Ping/Pong은 tungstenite가 자동 처리
                Err(e) => {
                    warn!("WebSocket 수신 에러: {e}");
                    // 에러는 참고용으로 올리고 루프를 끝낸다 —
                    // 채널이 닫히면 세션은 비계획 종료로 처리한다
                    let _ = tx.send(TransportEvent::Error(e.to_string())).await;
                    break;
                }
            }
        }
        debug!("WebSocket 수신 루프 종료");
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str) -> Result<TransportHandle, CoreError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| CoreError::Network(format!("WebSocket 연결 실패: {e}")))?;

        let (write, read) = ws_stream.split();
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        tokio::spawn(Self::read_loop(read, tx));

        Ok(TransportHandle {
            sink: Box::new(WsSink {
                write: Arc::new(tokio::sync::Mutex::new(write)),
            }),
            events: rx,
        })
    }
}

/// WebSocket 송신기
struct WsSink {
    write: Arc<tokio::sync::Mutex<SplitSink<WsStream, Message>>>,
}

#[async_trait]
impl TransportSink for WsSink {
    async fn send_text(&self, text: &str) -> Result<(), CoreError> {
        let mut write = self.write.lock().await;
        write
            .send(Message::Text(text.to_string().into()))
            .await
            .map_err(|e| CoreError::Network(format!("WebSocket 전송 실패: {e}")))
    }

    async fn close(&self) -> Result<(), CoreError> {
        let mut write = self.write.lock().await;
        write
            .send(Message::Close(None))
            .await
            .map_err(|e| CoreError::Network(format!("WebSocket 종료 실패: {e}")))
    }
}
