//! 에러 타입 정의

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// 타임아웃이 발생한 프로토콜 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    RequestHeader,
    Filename,
    ResponseHeader,
    Payload,
    Send,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Connect => "connect",
            Stage::RequestHeader => "request header",
            Stage::Filename => "filename",
            Stage::ResponseHeader => "response header",
            Stage::Payload => "payload",
            Stage::Send => "send",
        };
        f.write_str(name)
    }
}

/// 에러 분류
///
/// 치명/연결 한정 여부는 최상위 역할(클라이언트/서버)이 이 분류로 결정한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 인자, 소켓 생성, bind, connect 실패
    Setup,
    /// 매직 넘버, 타입, 길이 필드 위반
    Protocol,
    /// 타임아웃, 중간 I/O 실패
    Transport,
    /// 서버가 StatusCode 0 응답
    NotFound,
    /// 로컬 저장소 생성/쓰기 실패
    Storage,
}

/// RFP 프로토콜 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("유효하지 않은 매직 넘버: expected {expected:04X}, got {got:04X}")]
    InvalidMagicNumber { expected: u16, got: u16 },

    #[error("메시지 타입 불일치: expected {expected}, got {got}")]
    MessageTypeMismatch { expected: u8, got: u8 },

    #[error("유효하지 않은 StatusCode: {0} (0 또는 1이어야 함)")]
    InvalidStatusCode(u8),

    #[error("유효하지 않은 파일 이름 길이: {len} bytes ({min}~{max} 허용)")]
    InvalidFilenameLength { len: usize, min: usize, max: usize },

    #[error("파일 이름 뒤에 추가 데이터 수신: expected {expected} bytes")]
    TrailingData { expected: usize },

    #[error("데이터 부족: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("수신 바이트 불일치: expected {expected} bytes, got {got}")]
    LengthMismatch { expected: u64, got: u64 },

    #[error("페이로드가 너무 큼: {len} bytes")]
    PayloadTooLarge { len: usize },

    #[error("타임아웃: {stage}")]
    Timeout { stage: Stage },

    #[error("서버에서 파일을 찾거나 열 수 없음")]
    FileNotFound,

    #[error("저장소 에러 ({}): {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("저장소 쓰기 실패: {0}")]
    Write(#[source] std::io::Error),

    #[error("파일이 이미 존재하고 로컬에서 열 수 있음: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("포트는 {min}~{max} 범위여야 함: {got}")]
    InvalidPort { got: String, min: u16, max: u16 },

    #[error("주소 해석 실패: {0}")]
    AddressResolution(String),

    #[error("bind 실패 ({addr}): {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("서버 연결 실패 ({addr}): {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("유효하지 않은 인자: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// 에러 분류 반환
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidPort { .. }
            | Error::AddressResolution(_)
            | Error::Bind { .. }
            | Error::Connect { .. }
            | Error::DestinationExists(_)
            | Error::InvalidArgument(_) => ErrorKind::Setup,

            Error::InvalidMagicNumber { .. }
            | Error::MessageTypeMismatch { .. }
            | Error::InvalidStatusCode(_)
            | Error::InvalidFilenameLength { .. }
            | Error::TrailingData { .. }
            | Error::ShortRead { .. }
            | Error::LengthMismatch { .. }
            | Error::PayloadTooLarge { .. } => ErrorKind::Protocol,

            Error::Timeout { .. } | Error::Io(_) => ErrorKind::Transport,
            Error::FileNotFound => ErrorKind::NotFound,
            Error::Storage { .. } | Error::Write(_) => ErrorKind::Storage,
        }
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
