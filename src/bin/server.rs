//! RFP 서버 - Request File Protocol
//!
//! 요청받은 파일을 루트 디렉터리에서 찾아 응답한다.
//! - 기본은 한 번에 한 연결 순차 처리
//! - 잘못된 요청이나 타임아웃은 해당 연결만 끊고 계속 서비스
//!
//! 사용법:
//!   cargo run --release --bin rfp-server -- <port> [OPTIONS]
//!
//! 예시:
//!   cargo run --release --bin rfp-server -- 9000 --root ./shared

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rfp::{parse_port, Config, Error, Result, Server};

const USAGE: &str = "Usage: rfp-server <port> [OPTIONS]";

/// 서버 설정
struct ServerConfig {
    bind_addr: SocketAddr,
    config: Config,
}

enum Command {
    Run(ServerConfig),
    Help,
}

fn parse_args(args: &[String]) -> Result<Command> {
    let mut port = None;
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--root" | "-r" => {
                let dir = args
                    .get(i + 1)
                    .ok_or_else(|| Error::InvalidArgument("--root 뒤에 디렉터리 필요".into()))?;
                config = config.with_root_dir(PathBuf::from(dir));
                i += 1;
            }
            "--concurrent" | "-c" => {
                config = config.with_concurrent(true);
            }
            "--timeout-ms" | "-t" => {
                let ms: u64 = args
                    .get(i + 1)
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(|| Error::InvalidArgument("--timeout-ms 뒤에 숫자 필요".into()))?;
                config = config.with_io_timeout(Duration::from_millis(ms));
                i += 1;
            }
            "--help" | "-h" => return Ok(Command::Help),
            other if port.is_none() => port = Some(parse_port(other)?),
            other => {
                return Err(Error::InvalidArgument(format!(
                    "알 수 없는 인자: {}\n{}",
                    other, USAGE
                )))
            }
        }
        i += 1;
    }

    let port = port.ok_or_else(|| Error::InvalidArgument(USAGE.to_string()))?;
    Ok(Command::Run(ServerConfig {
        bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
        config,
    }))
}

fn print_help() {
    println!(
        r#"RFP Server - Request File Protocol 서버

요청받은 파일을 찾아 헤더 + 데이터로 응답
- 없거나 열 수 없는 파일은 StatusCode 0
- 연결 단위 에러는 로그만 남기고 계속 서비스

{USAGE}

인자:
  <port>                  바인드 포트 (1024~64000)

옵션:
  -r, --root <DIR>        파일 루트 디렉터리, 밖으로 나가는 이름은 거부 (기본: .)
  -c, --concurrent        연결마다 태스크로 동시 처리
  -t, --timeout-ms <MS>   read/write 타임아웃 (기본: 1000)
  -h, --help              이 도움말 출력

로그 레벨은 RUST_LOG로 조정 (기본: info)
"#
    );
}

#[tokio::main]
async fn main() {
    // 로깅 설정
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("로깅 초기화 실패: {}", e);
    }

    let args: Vec<String> = std::env::args().collect();
    let server_config = match parse_args(&args) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            print_help();
            return;
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("RFP Server starting...");
    info!("Root directory: {:?}", server_config.config.root_dir);
    info!("I/O timeout: {:?}", server_config.config.io_timeout);

    let server = match Server::bind(server_config.bind_addr, server_config.config).await {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("시그널 대기 실패: {}", e);
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = server.serve_until(shutdown).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
