//! 프로토콜 설정

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result, DEFAULT_CHUNK_SIZE, DEFAULT_TIMEOUT, MAX_PORT, MIN_PORT};

/// RFP 프로토콜 설정
///
/// 클라이언트와 서버가 같은 구조체를 사용한다. 연결 간 공유되는 가변 상태는 없고
/// 동시 처리 모드에서도 연결마다 복제본을 가진다.
#[derive(Debug, Clone)]
pub struct Config {
    /// 페이로드 수신 청크 크기 (바이트)
    pub chunk_size: usize,

    /// read/write 1회당 타임아웃
    pub io_timeout: Duration,

    /// connect 타임아웃 (클라이언트)
    pub connect_timeout: Duration,

    /// 요청 파일을 찾을 루트 디렉터리 (서버)
    pub root_dir: PathBuf,

    /// 연결마다 태스크를 띄워 동시 처리 (서버)
    /// false면 한 번에 한 연결만 처리
    pub concurrent: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            io_timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_TIMEOUT,
            root_dir: PathBuf::from("."),
            concurrent: false,
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 느린 네트워크용 설정
    pub fn patient() -> Self {
        Self {
            chunk_size: 16 * 1024,
            io_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            ..Self::default()
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = root_dir.into();
        self
    }

    pub fn with_concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }
}

/// 포트 문자열 검증 (1024~64000, 양끝 포함)
pub fn parse_port(value: &str) -> Result<u16> {
    let invalid = || Error::InvalidPort {
        got: value.to_string(),
        min: MIN_PORT,
        max: MAX_PORT,
    };

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let port: u32 = value.parse().map_err(|_| invalid())?;
    if port < MIN_PORT as u32 || port > MAX_PORT as u32 {
        return Err(invalid());
    }

    Ok(port as u16)
}
