//! RFP 클라이언트 - Request File Protocol
//!
//! 서버에 파일 하나를 요청해 같은 이름으로 현재 디렉터리에 저장한다.
//!
//! 사용법:
//!   cargo run --release --bin rfp-client -- <host> <port> <filename> [OPTIONS]
//!
//! 예시:
//!   cargo run --release --bin rfp-client -- 127.0.0.1 9000 report.txt

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rfp::{check_destination, parse_port, Client, Config, Error, Result};

const USAGE: &str = "Usage: rfp-client <host> <port> <filename> [OPTIONS]";

/// 클라이언트 설정
struct ClientConfig {
    host: String,
    port: u16,
    filename: String,
    config: Config,
}

enum Command {
    Run(ClientConfig),
    Help,
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> Result<T> {
    value
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| Error::InvalidArgument(format!("{} 뒤에 유효한 숫자 필요", flag)))
}

fn parse_args(args: &[String]) -> Result<Command> {
    let mut positional = Vec::new();
    // 프리셋을 먼저 고르고 나머지 옵션으로 덮어쓴다
    let mut config = if args.iter().any(|a| a == "--patient") {
        Config::patient()
    } else {
        Config::default()
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--timeout-ms" | "-t" => {
                let ms: u64 = parse_number(&args[i], args.get(i + 1))?;
                config = config
                    .with_io_timeout(Duration::from_millis(ms))
                    .with_connect_timeout(Duration::from_millis(ms));
                i += 1;
            }
            "--chunk-size" => {
                let size: usize = parse_number(&args[i], args.get(i + 1))?;
                config = config.with_chunk_size(size);
                i += 1;
            }
            "--patient" => {}
            "--help" | "-h" => return Ok(Command::Help),
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let [host, port, filename]: [String; 3] = positional
        .try_into()
        .map_err(|_| Error::InvalidArgument(USAGE.to_string()))?;

    Ok(Command::Run(ClientConfig {
        host,
        port: parse_port(&port)?,
        filename,
        config,
    }))
}

fn print_help() {
    println!(
        r#"RFP Client - Request File Protocol 클라이언트

서버에서 파일 하나를 받아 같은 이름으로 저장
- 같은 이름의 파일이 이미 있고 열 수 있으면 거부
- 수신 실패 시 쓰다 만 파일 삭제

{USAGE}

인자:
  <host>                  서버 IP 또는 도메인 이름
  <port>                  서버 포트 (1024~64000)
  <filename>              요청할 파일 이름 (1~1024 bytes)

옵션:
  -t, --timeout-ms <MS>   connect/read/write 타임아웃 (기본: 1000)
  --chunk-size <SIZE>     수신 청크 크기 바이트 (기본: 4096)
  --patient               느린 네트워크용 프리셋 (타임아웃 10초, 청크 16KB)
  -h, --help              이 도움말 출력

로그 레벨은 RUST_LOG로 조정 (기본: info)
"#
    );
}

/// 호스트 이름 해석 (IPv4 우선)
async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| Error::AddressResolution(format!("{}: {}", host, e)))?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| Error::AddressResolution(host.to_string()))
}

async fn run(client_config: ClientConfig) -> Result<()> {
    let dest = PathBuf::from(&client_config.filename);
    check_destination(&dest)?;

    let addr = resolve(&client_config.host, client_config.port).await?;
    info!("Requesting {} from {}", client_config.filename, addr);

    let mut client = Client::new(client_config.config);
    let stats = client.fetch(addr, &client_config.filename, &dest).await?;

    info!("Successfully downloaded {}.", client_config.filename);
    info!("Size: {} bytes", stats.total_bytes);
    info!("Time Taken: {:.4} s", stats.elapsed().as_secs_f64());
    match stats.throughput() {
        Some(bps) => info!("Average download speed: {:.2} MB/s", bps / 1_000_000.0),
        None => info!("Download time was too short to measure the download speed."),
    }

    Ok(())
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
    let client_config = match parse_args(&args) {
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

    if let Err(e) = run(client_config).await {
        match e {
            Error::FileNotFound => error!("File couldn't be found or opened on the server."),
            other => error!("{} ({:?})", other, other.kind()),
        }
        std::process::exit(1);
    }
}
