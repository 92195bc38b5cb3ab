//! 요청 처리자 (서버측)
//!
//! - 무한 accept 루프, 기본은 한 번에 한 연결
//! - 연결별 상태: Accepted → HeaderRead → FilenameRead → Resolved → Responded → Closed
//! - 잘못된 요청/타임아웃/I/O 에러는 해당 연결만 종료

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::message::{FileRequest, FileResponse, RequestHeader, StatusCode};
use crate::transfer::{read_filename, read_header, send_message};
use crate::{Config, Error, Result, Stage, REQUEST_HEADER_LEN};

/// 연결별 처리 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Accepted,
    HeaderRead,
    FilenameRead,
    Resolved,
    Responded,
    Closed,
}

/// 연결 처리 결과
#[derive(Debug, Clone)]
pub struct ConnectionReport {
    /// 요청된 파일 이름
    pub filename: String,

    /// 응답 상태
    pub status: StatusCode,

    /// 보낸 데이터 바이트 (헤더 제외)
    pub bytes_sent: u64,
}

/// 파일 서버
pub struct Server {
    config: Config,
    listener: TcpListener,
}

impl Server {
    /// 리스너 바인딩. 실패는 프로세스 치명 에러
    pub async fn bind(addr: SocketAddr, config: Config) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|source| Error::Bind {
            addr: addr.to_string(),
            source,
        })?;

        info!("RFP Server listening on {}", addr);
        Ok(Self { config, listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// 종료 없이 계속 서비스
    pub async fn serve(self) -> Result<()> {
        self.serve_until(std::future::pending()).await
    }

    /// `shutdown`이 완료될 때까지 연결 수락
    pub async fn serve_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "Serving files from {:?} ({})",
            self.config.root_dir,
            if self.config.concurrent { "concurrent" } else { "sequential" }
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("연결 수락 실패: {}", e);
                            continue;
                        }
                    };

                    info!("Connection: IP {} Port {}", peer.ip(), peer.port());

                    if self.config.concurrent {
                        let config = self.config.clone();
                        tokio::spawn(async move {
                            serve_connection(stream, peer, &config).await;
                        });
                    } else {
                        serve_connection(stream, peer, &self.config).await;
                    }
                }
            }
        }
    }
}

/// 연결 하나를 처리하고 결과를 로그로 남긴다. 에러는 여기서 끝난다.
async fn serve_connection(mut stream: TcpStream, peer: SocketAddr, config: &Config) {
    match handle_connection(&mut stream, config).await {
        Ok(report) if report.status == StatusCode::Success => {
            info!("{} sent to client {}", report.filename, peer);
            info!("Transferred {} bytes", report.bytes_sent);
        }
        Ok(report) => {
            info!("{} unavailable, sent StatusCode 0 to {}", report.filename, peer);
        }
        Err(e) => {
            warn!("연결 {} 처리 실패 ({:?}): {}", peer, e.kind(), e);
        }
    }

    let _ = stream.shutdown().await;
    debug!("연결 {} 상태: {:?}", peer, ConnectionState::Closed);
}

fn transition(state: &mut ConnectionState, next: ConnectionState) {
    debug!("연결 상태: {:?} -> {:?}", state, next);
    *state = next;
}

/// 요청 하나 처리
///
/// 헤더와 파일 이름을 검증하고, 파일을 읽어 응답을 보낸다.
/// 스트림을 닫는 것은 호출자 몫이다.
pub async fn handle_connection<S>(stream: &mut S, config: &Config) -> Result<ConnectionReport>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut state = ConnectionState::Accepted;

    let raw: [u8; REQUEST_HEADER_LEN] =
        read_header(stream, config.io_timeout, Stage::RequestHeader).await?;
    let header = RequestHeader::from_bytes(&raw)?;
    transition(&mut state, ConnectionState::HeaderRead);

    let filename =
        read_filename(stream, header.filename_len as usize, config.io_timeout).await?;
    let request = FileRequest::new(filename)?;
    transition(&mut state, ConnectionState::FilenameRead);

    let response = resolve_file(&config.root_dir, &request).await;
    transition(&mut state, ConnectionState::Resolved);

    let bytes_sent = send_message(
        stream,
        &response.header().to_bytes(),
        &response.data,
        config.chunk_size,
        config.io_timeout,
    )
    .await?;
    transition(&mut state, ConnectionState::Responded);

    Ok(ConnectionReport {
        filename: request.filename_lossy(),
        status: response.status(),
        bytes_sent,
    })
}

/// 루트 아래 경로로 변환. 절대 경로나 `..`처럼 루트를 벗어나는 이름은 None.
fn confined_path(root: &Path, name: &str) -> Option<PathBuf> {
    let relative = Path::new(name);
    let inside = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    inside.then(|| root.join(relative))
}

/// 요청 파일을 읽어 응답 생성
///
/// 없음과 열기 실패는 클라이언트에게 똑같이 StatusCode 0이다. 원인은 로그에만 남긴다.
async fn resolve_file(root: &Path, request: &FileRequest) -> FileResponse {
    let name = request.filename_lossy();
    let Some(path) = confined_path(root, &name) else {
        warn!("Requested path escapes root directory: {:?}", name);
        return FileResponse::not_found();
    };

    match tokio::fs::read(&path).await {
        Ok(data) => match FileResponse::new(data) {
            Ok(response) => response,
            Err(e) => {
                warn!("{:?}: {}", path, e);
                FileResponse::not_found()
            }
        },
        Err(e) => {
            let is_file = tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if is_file {
                warn!("Requested file couldn't be opened: {:?} ({})", path, e);
            } else {
                info!("Requested file does not exist: {:?}", path);
            }
            FileResponse::not_found()
        }
    }
}
