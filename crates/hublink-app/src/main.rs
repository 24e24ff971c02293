//! # hublink-app
//!
//! HUBLINK CLI 진입점.
//! 역할 서브커맨드별로 설정 + 세션 + 라우터를 묶어 타입드 스트림을 출력한다.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hublink_core::config::AppConfig;
use hublink_core::config_manager::ConfigManager;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// HUBLINK 클라이언트
///
/// 재연결형 Hub 세션 클라이언트 (채팅 / 대시보드 / 로그 / 게이트웨이)
#[derive(Parser, Debug)]
#[command(name = "hublink")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Hub 호스트 재정의 (기본: localhost)
    #[arg(long, global = true)]
    host: Option<String>,

    /// TLS 사용 (wss + SSL 커넥터 포트)
    #[arg(long, global = true)]
    tls: bool,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', global = true, default_value = "info")]
    log_level: String,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉터리의 config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 채팅 세션 (stdin 한 줄 = 메시지 하나, /upload <경로>, /quit)
    Chat {
        /// 채팅 사용자명
        #[arg(long, short = 'u')]
        username: String,
    },
    /// 서비스 레지스트리 대시보드 (25초 하트비트 자동 유지)
    Dashboard {
        /// 대시보드 식별자
        #[arg(long, short = 'u', default_value = "Dashboard-User")]
        username: String,
    },
    /// 실시간 로그 스트림 (접속 시 히스토리 요청)
    Logs {
        /// 접속 직후 서버 로그 비우기
        #[arg(long)]
        clear: bool,
    },
    /// API 게이트웨이 단발 명령
    Gateway {
        #[command(subcommand)]
        action: GatewayAction,
    },
}

#[derive(Subcommand, Debug)]
enum GatewayAction {
    /// 파일 목록 조회
    List,
    /// 날씨 조회
    Weather {
        /// 도시명
        city: String,
    },
    /// 파일 다운로드 (내용을 stdout으로)
    Download {
        /// 파일명
        file_name: String,
    },
    /// 파일 업로드 (텍스트 파일을 WS 명령으로 전송)
    Upload {
        /// 로컬 파일 경로
        path: PathBuf,
    },
}

/// 설정 로드 — 파일이 없으면 기본값으로 생성, 관리자 초기화가
/// 아예 불가능하면 기본 설정으로 계속한다.
fn load_config(path: Option<PathBuf>) -> AppConfig {
    let manager = match path {
        Some(p) => ConfigManager::with_path(p),
        None => ConfigManager::new(),
    };
    match manager {
        Ok(manager) => {
            info!("설정 파일: {:?}", manager.config_path());
            manager.get()
        }
        Err(e) => {
            warn!("설정 관리자 초기화 실패, 기본 설정 사용: {e}");
            AppConfig::default_config()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "hublink={0},hublink_app={0},hublink_core={0},hublink_network={0}",
        args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    let mut config = load_config(args.config);
    if let Some(host) = args.host {
        config.hub.host = host;
    }
    if args.tls {
        config.hub.use_tls = true;
    }

    match args.command {
        Command::Chat { username } => commands::run_chat(config, &username).await,
        Command::Dashboard { username } => commands::run_dashboard(config, &username).await,
        Command::Logs { clear } => commands::run_logs(config, clear).await,
        Command::Gateway { action } => commands::run_gateway(config, action).await,
    }
}
