//! 연결 수립자 (클라이언트측)
//!
//! 상태: Idle → Connected → RequestSent → HeaderReceived → Transferring → Done | Failed
//!
//! 단일 시도(재시도 없음). 전송 중 실패하면 쓰다 만 파일을 삭제한다.

use std::net::SocketAddr;
use std::path::Path;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::message::{FileRequest, ResponseHeader, StatusCode};
use crate::stats::TransferStats;
use crate::transfer::{read_header, receive_payload, send_message};
use crate::{Config, Error, Result, Stage, RESPONSE_HEADER_LEN};

/// 클라이언트 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Connected,
    RequestSent,
    HeaderReceived,
    Transferring,
    Done,
    Failed,
}

/// 저장 위치 사전 검사
///
/// 파일이 존재하고 읽기용으로 열리면 거부한다. 존재하지만 열 수 없는 파일은
/// 덮어쓰기를 허용한다.
pub fn check_destination(path: &Path) -> Result<()> {
    if path.is_file() && std::fs::File::open(path).is_ok() {
        return Err(Error::DestinationExists(path.to_path_buf()));
    }
    Ok(())
}

/// 파일 요청 클라이언트
pub struct Client {
    config: Config,
    state: ClientState,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: ClientState::Idle,
        }
    }

    /// 현재 상태
    pub fn state(&self) -> ClientState {
        self.state
    }

    fn transition(&mut self, next: ClientState) {
        debug!("클라이언트 상태: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// 서버에 연결하고 `filename`을 요청해 `dest`에 저장
    pub async fn fetch(
        &mut self,
        addr: SocketAddr,
        filename: &str,
        dest: &Path,
    ) -> Result<TransferStats> {
        match self.connect(addr).await {
            Ok(mut stream) => self.fetch_over(&mut stream, filename, dest).await,
            Err(e) => {
                self.transition(ClientState::Failed);
                Err(e)
            }
        }
    }

    async fn connect(&mut self, addr: SocketAddr) -> Result<TcpStream> {
        let connect = TcpStream::connect(addr);
        let stream = match tokio::time::timeout(self.config.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(Error::Connect {
                    addr: addr.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(Error::Timeout {
                    stage: Stage::Connect,
                })
            }
        };

        info!("Connected to {}", addr);
        self.transition(ClientState::Connected);
        Ok(stream)
    }

    /// 이미 연결된 스트림으로 요청/수신
    pub async fn fetch_over<S>(
        &mut self,
        stream: &mut S,
        filename: &str,
        dest: &Path,
    ) -> Result<TransferStats>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if self.state == ClientState::Idle {
            self.transition(ClientState::Connected);
        }

        let result = self.exchange(stream, filename, dest).await;
        match &result {
            Ok(_) => self.transition(ClientState::Done),
            Err(_) => self.transition(ClientState::Failed),
        }
        result
    }

    async fn exchange<S>(
        &mut self,
        stream: &mut S,
        filename: &str,
        dest: &Path,
    ) -> Result<TransferStats>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request = FileRequest::new(Bytes::copy_from_slice(filename.as_bytes()))?;
        send_message(
            stream,
            &request.header().to_bytes(),
            &request.filename,
            self.config.chunk_size,
            self.config.io_timeout,
        )
        .await?;
        self.transition(ClientState::RequestSent);

        let raw: [u8; RESPONSE_HEADER_LEN] =
            read_header(stream, self.config.io_timeout, Stage::ResponseHeader).await?;
        let header = ResponseHeader::from_bytes(&raw)?;
        self.transition(ClientState::HeaderReceived);

        if header.status == StatusCode::NotFound {
            return Err(Error::FileNotFound);
        }

        let file = tokio::fs::File::create(dest)
            .await
            .map_err(|source| Error::Storage {
                path: dest.to_path_buf(),
                source,
            })?;
        self.transition(ClientState::Transferring);

        info!("Downloading {} ({} bytes)...", filename, header.data_len);

        let declared_len = header.data_len as u64;
        let stats = receive_into(stream, file, dest, declared_len, &self.config).await?;
        debug!("Successfully downloaded {}. {}", filename, stats.summary());
        Ok(stats)
    }
}

/// 페이로드를 `writer`로 받아 저장
///
/// 실패하면 `writer`를 닫고 `dest`를 삭제한다. 쓰기 실패는 경로를 붙여 Storage로 바꾼다.
async fn receive_into<R, W>(
    reader: &mut R,
    mut writer: W,
    dest: &Path,
    declared_len: u64,
    config: &Config,
) -> Result<TransferStats>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = receive_payload(
        reader,
        &mut writer,
        declared_len,
        config.chunk_size,
        config.io_timeout,
    )
    .await;
    drop(writer);

    match result {
        Ok(stats) => Ok(stats),
        Err(e) => {
            remove_partial(dest).await;
            Err(match e {
                Error::Write(source) => Error::Storage {
                    path: dest.to_path_buf(),
                    source,
                },
                other => other,
            })
        }
    }
}

/// 쓰다 만 파일 삭제
async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("불완전한 파일 삭제: {:?}", path),
        Err(e) => warn!("File couldn't be removed: {:?} ({})", path, e),
    }
}
