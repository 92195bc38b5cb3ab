//! # RFP (Request File Protocol)
//!
//! TCP 기반 단일 파일 요청/응답 프로토콜
//!
//! ## 핵심 특징
//! - **고정 헤더**: 요청 5바이트, 응답 8바이트 (빅엔디안, 패딩 없음)
//! - **선언 길이 검증**: 헤더의 길이 필드와 실제 수신 바이트 수가 다르면 에러
//! - **청크 스트리밍**: 클라이언트는 수신 청크를 즉시 디스크에 기록
//! - **타임아웃**: connect/read/write 전부 제한 시간 적용 (기본 1초)
//! - **연결 단위 격리**: 서버는 잘못된 요청이 와도 해당 연결만 종료

use std::time::Duration;

pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod server;
pub mod stats;
pub mod transfer;

pub use client::{check_destination, Client, ClientState};
pub use config::{parse_port, Config};
pub use error::{Error, ErrorKind, Result, Stage};
pub use message::{
    FileRequest, FileResponse, MessageType, RequestHeader, ResponseHeader, StatusCode,
};
pub use server::{ConnectionReport, ConnectionState, Server};
pub use stats::TransferStats;

/// 매직 넘버 (요청/응답 공통)
pub const MAGIC_NUMBER: u16 = 0x497E;

/// 요청 헤더 길이: magic(2) + type(1) + filename_len(2)
pub const REQUEST_HEADER_LEN: usize = 5;

/// 응답 헤더 길이: magic(2) + type(1) + status(1) + data_len(4)
pub const RESPONSE_HEADER_LEN: usize = 8;

/// 파일 이름 최소 길이 (바이트)
pub const MIN_FILENAME_LEN: usize = 1;

/// 파일 이름 최대 길이 (바이트)
pub const MAX_FILENAME_LEN: usize = 1024;

/// 기본 청크 크기 (바이트)
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// 기본 I/O 타임아웃
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// 허용 포트 범위 (양끝 포함)
pub const MIN_PORT: u16 = 1024;
pub const MAX_PORT: u16 = 64000;
