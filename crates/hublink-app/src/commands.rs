//! 역할 서브커맨드 실행기.
//!
//! 각 실행기는 세션 하나를 열고, 라우터 구독을 터미널 출력으로 바꾸고,
//! Ctrl+C 또는 터미널 상태 전이에서 정리한다.

use std::time::Duration;

use anyhow::{bail, Result};
use hublink_core::config::AppConfig;
use hublink_core::models::log::LogBuffer;
use hublink_core::models::message::{Envelope, GatewayCommand, Inbound, Outbound};
use hublink_core::models::role::Role;
use hublink_core::models::session::ConnectionStatus;
use hublink_network::session::SessionClient;
use hublink_network::typing::TypingNotifier;
use hublink_network::upload::FileUploadClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// 상태 전이를 로그로 흘린다 (세션이 끝나면 태스크도 끝난다)
fn spawn_status_logger(session: &SessionClient) {
    let mut rx = session.watch_status();
    tokio::spawn(async move {
        loop {
            let status = *rx.borrow_and_update();
            info!("세션 상태: {status}");
            if status == ConnectionStatus::Failed {
                warn!("재연결 한도 소진 — 세션 종료");
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    });
}

/// Connected가 될 때까지 대기. Failed로 끝나면 에러.
async fn wait_connected(session: &SessionClient) -> Result<()> {
    let mut rx = session.watch_status();
    loop {
        match *rx.borrow_and_update() {
            ConnectionStatus::Connected => return Ok(()),
            ConnectionStatus::Failed => {
                let reason = session
                    .last_error()
                    .unwrap_or_else(|| "알 수 없는 원인".to_string());
                bail!("Hub 연결 실패: {reason}");
            }
            _ => {}
        }
        if rx.changed().await.is_err() {
            bail!("세션이 먼저 종료됨");
        }
    }
}

// ============================================================
// chat
// ============================================================

pub async fn run_chat(config: AppConfig, username: &str) -> Result<()> {
    let session = SessionClient::new(&config.hub, Role::Chat, config.session.clone())?;
    let uploader = FileUploadClient::new(&config.hub.upload_url())?;
    let typing = TypingNotifier::new(
        session.clone(),
        Duration::from_millis(config.session.typing_window_ms),
    );
    spawn_status_logger(&session);

    // 수신 스트림 출력
    let mut rx = session.router().subscribe_all();
    tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            match msg {
                Inbound::Chat(chat) => {
                    let who = chat.username.as_deref().unwrap_or("?");
                    println!("[{who}] {}", chat.text);
                }
                Inbound::System(chat) => println!("── {} ──", chat.text),
                Inbound::UserListUpdate { users } => {
                    println!("접속자 ({}): {}", users.len(), users.join(", "));
                }
                Inbound::Typing { username } => {
                    println!("… {} 입력 중", username.as_deref().unwrap_or("누군가"));
                }
                Inbound::StopTyping { .. } => {}
                Inbound::Error { text } => warn!("서버 에러: {text}"),
                other => debug!("무시된 메시지: {}", other.kind()),
            }
        }
    });

    session.connect(username).await;
    info!("채팅 입장: {username} ({})", session.url());
    println!("한 줄 입력 = 메시지 전송, /upload <경로> = 파일 업로드, /quit = 종료");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "/quit" {
                    break;
                }
                if let Some(path) = line.strip_prefix("/upload ") {
                    upload_file(&uploader, username, path.trim()).await;
                    continue;
                }
                // 라인 버퍼 입력이라 제출 시점에만 타이핑 신호를 낸다
                typing.keystroke().await;
                if let Err(e) = session.send(&Outbound::from(Envelope::message(line))).await {
                    warn!("전송 실패: {e}");
                }
                typing.message_sent().await;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    typing.cancel();
    session.disconnect().await;
    info!("채팅 종료");
    Ok(())
}

async fn upload_file(uploader: &FileUploadClient, username: &str, path: &str) {
    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());
    match tokio::fs::read(path).await {
        Ok(bytes) => match uploader.upload(username, &file_name, bytes).await {
            Ok(()) => println!("업로드 완료: {file_name}"),
            Err(e) => warn!("업로드 실패: {e}"),
        },
        Err(e) => warn!("파일 읽기 실패 ({path}): {e}"),
    }
}

// ============================================================
// dashboard
// ============================================================

pub async fn run_dashboard(config: AppConfig, username: &str) -> Result<()> {
    let session = SessionClient::new(&config.hub, Role::Registry, config.session.clone())?;
    spawn_status_logger(&session);

    let mut rx = session.router().subscribe_all();
    tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            match msg {
                Inbound::ServiceRegistryUpdate { services } => {
                    println!("── 서비스 {}개 ──", services.len());
                    for svc in services {
                        println!(
                            "  {:<24} {:<10} {}:{}",
                            svc.name,
                            svc.status,
                            svc.host.as_deref().unwrap_or("?"),
                            svc.port.map(|p| p.to_string()).unwrap_or_default(),
                        );
                    }
                }
                // 온라인/오프라인 단건 통지는 주기 스냅샷과 중복 — 참고 로그만
                Inbound::ServiceOnline { raw } | Inbound::ServiceOffline { raw } => {
                    debug!("서비스 상태 통지: {raw}");
                }
                Inbound::ServiceResult { result_from, data } => {
                    println!("[{result_from}] {data}");
                }
                Inbound::Pong => debug!("PONG"),
                Inbound::Error { text } => warn!("서버 에러: {text}"),
                other => debug!("무시된 메시지: {}", other.kind()),
            }
        }
    });

    session.connect(username).await;
    info!("대시보드 접속: {}", session.url());

    tokio::signal::ctrl_c().await?;
    session.disconnect().await;
    info!("대시보드 종료");
    Ok(())
}

// ============================================================
// logs
// ============================================================

pub async fn run_logs(config: AppConfig, clear: bool) -> Result<()> {
    let session = SessionClient::new(&config.hub, Role::LogStream, config.session.clone())?;
    spawn_status_logger(&session);

    let mut rx = session.router().subscribe_all();
    tokio::spawn(async move {
        let mut buffer = LogBuffer::default();
        while let Ok(msg) = rx.recv().await {
            match msg {
                Inbound::LogMessage(entry) => {
                    print_log_entry(&entry);
                    buffer.push(entry);
                }
                Inbound::LogHistory { count, logs } => {
                    info!("로그 히스토리 수신: {count}건");
                    for entry in &logs {
                        print_log_entry(entry);
                    }
                    buffer.replace(logs);
                }
                Inbound::LogStats(stats) => {
                    info!(
                        "로그 통계: 수신 {}건 / {}바이트, 연결 {}개",
                        stats.messages_received, stats.bytes_received, stats.active_connections
                    );
                }
                Inbound::ClearLogs => {
                    buffer.clear();
                    println!("── 로그 비워짐 ──");
                }
                Inbound::Error { text } => warn!("서버 에러: {text}"),
                other => debug!("무시된 메시지: {}", other.kind()),
            }
        }
    });

    session.connect("log-viewer").await;
    info!("로그 스트림 접속: {}", session.url());

    if clear {
        wait_connected(&session).await?;
        session.send(&Outbound::Envelope(Envelope::ClearLogs)).await?;
    }

    tokio::signal::ctrl_c().await?;
    session.disconnect().await;
    info!("로그 스트림 종료");
    Ok(())
}

fn print_log_entry(entry: &hublink_core::models::log::LogEntry) {
    println!(
        "{:<5} {:<20} {}",
        entry.level.as_deref().unwrap_or("-"),
        entry.service.as_deref().unwrap_or("-"),
        entry.message,
    );
}

// ============================================================
// gateway
// ============================================================

/// 응답 대기 한도 — 게이트웨이는 단발 요청/응답이므로 무한정 기다리지 않는다
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(15);

pub async fn run_gateway(config: AppConfig, action: crate::GatewayAction) -> Result<()> {
    let session = SessionClient::new(&config.hub, Role::ApiGateway, config.session.clone())?;
    spawn_status_logger(&session);
    let mut rx = session.router().subscribe_all();

    session.connect("gateway-cli").await;
    wait_connected(&session).await?;

    let command = match &action {
        crate::GatewayAction::List => GatewayCommand::ListFiles,
        crate::GatewayAction::Weather { city } => GatewayCommand::FetchWeather { city: city.clone() },
        crate::GatewayAction::Download { file_name } => GatewayCommand::DownloadFile {
            file_name: file_name.clone(),
        },
        crate::GatewayAction::Upload { path } => {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            let file_data = tokio::fs::read_to_string(path).await?;
            GatewayCommand::UploadFile { file_name, file_data }
        }
    };
    session.send(&Outbound::from(command)).await?;

    // 명령에 대응하는 첫 응답(또는 에러)까지만 기다린다
    let result = tokio::time::timeout(GATEWAY_TIMEOUT, async {
        loop {
            let msg = match rx.recv().await {
                Ok(msg) => msg,
                Err(_) => bail!("세션이 먼저 종료됨"),
            };
            match msg {
                Inbound::FileList { files } => {
                    if files.is_empty() {
                        println!("저장된 파일 없음");
                    }
                    for file in files {
                        println!("{file}");
                    }
                    return Ok(());
                }
                Inbound::FileUploadSuccess { file_name, message } => {
                    println!(
                        "업로드 완료: {file_name}{}",
                        message.map(|m| format!(" ({m})")).unwrap_or_default()
                    );
                    return Ok(());
                }
                Inbound::FileDownloadSuccess { file_name, file_data } => {
                    info!("다운로드 완료: {file_name}");
                    println!("{file_data}");
                    return Ok(());
                }
                Inbound::WeatherResponse(report) => {
                    println!(
                        "{}: {}℃, {} (습도 {}%, 풍속 {}m/s)",
                        report.status.as_deref().unwrap_or("?"),
                        report.temperature.unwrap_or_default(),
                        report.condition.as_deref().unwrap_or("?"),
                        report.humidity.unwrap_or_default(),
                        report.wind_speed.unwrap_or_default(),
                    );
                    return Ok(());
                }
                Inbound::Error { text } => bail!("게이트웨이 에러: {text}"),
                other => debug!("무시된 메시지: {}", other.kind()),
            }
        }
    })
    .await;

    session.disconnect().await;
    match result {
        Ok(inner) => inner,
        Err(_) => bail!("게이트웨이 응답 대기 시간 초과"),
    }
}
