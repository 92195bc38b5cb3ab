//! 프로토콜 메시지 정의
//!
//! ```text
//! 요청: MagicNo(u16) | Type(u8)=1 | FilenameLen(u16) | Filename
//! 응답: MagicNo(u16) | Type(u8)=2 | StatusCode(u8) | DataLen(u32) | Data
//! ```
//!
//! 전부 빅엔디안, 패딩 없음. 이 모듈은 I/O를 하지 않고 페이로드 내용도 보지 않는다.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    Error, Result, MAGIC_NUMBER, MAX_FILENAME_LEN, MIN_FILENAME_LEN, REQUEST_HEADER_LEN,
    RESPONSE_HEADER_LEN,
};

/// 메시지 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// 파일 요청 (클라이언트 → 서버)
    Request = 1,

    /// 파일 응답 (서버 → 클라이언트)
    Response = 2,
}

/// 응답 상태 코드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusCode {
    /// 파일이 없거나 열 수 없음
    NotFound = 0,

    /// 성공
    Success = 1,
}

impl TryFrom<u8> for StatusCode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(StatusCode::NotFound),
            1 => Ok(StatusCode::Success),
            other => Err(Error::InvalidStatusCode(other)),
        }
    }
}

fn check_filename_len(len: usize) -> Result<()> {
    if !(MIN_FILENAME_LEN..=MAX_FILENAME_LEN).contains(&len) {
        return Err(Error::InvalidFilenameLength {
            len,
            min: MIN_FILENAME_LEN,
            max: MAX_FILENAME_LEN,
        });
    }
    Ok(())
}

fn check_magic_and_type(buf: &mut &[u8], expected: MessageType) -> Result<()> {
    let magic = buf.get_u16();
    if magic != MAGIC_NUMBER {
        return Err(Error::InvalidMagicNumber {
            expected: MAGIC_NUMBER,
            got: magic,
        });
    }

    let msg_type = buf.get_u8();
    if msg_type != expected as u8 {
        return Err(Error::MessageTypeMismatch {
            expected: expected as u8,
            got: msg_type,
        });
    }

    Ok(())
}

/// 요청 헤더 (5바이트)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    /// 뒤따르는 파일 이름 길이 (1~1024)
    pub filename_len: u16,
}

impl RequestHeader {
    /// 헤더 디코딩 및 검증
    ///
    /// 앞 5바이트만 본다. 매직 넘버, 타입, 길이 범위 순서로 검사한다.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < REQUEST_HEADER_LEN {
            return Err(Error::ShortRead {
                expected: REQUEST_HEADER_LEN,
                got: bytes.len(),
            });
        }

        let mut buf = &bytes[..REQUEST_HEADER_LEN];
        check_magic_and_type(&mut buf, MessageType::Request)?;

        let filename_len = buf.get_u16();
        check_filename_len(filename_len as usize)?;

        Ok(Self { filename_len })
    }

    pub fn to_bytes(&self) -> [u8; REQUEST_HEADER_LEN] {
        let mut out = [0u8; REQUEST_HEADER_LEN];
        let mut buf = &mut out[..];
        buf.put_u16(MAGIC_NUMBER);
        buf.put_u8(MessageType::Request as u8);
        buf.put_u16(self.filename_len);
        out
    }
}

/// 파일 요청 메시지
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRequest {
    /// 파일 이름 (널 종료 없음)
    pub filename: Bytes,
}

impl FileRequest {
    /// 새 요청 생성 (파일 이름 1~1024바이트)
    pub fn new(filename: impl Into<Bytes>) -> Result<Self> {
        let filename = filename.into();
        check_filename_len(filename.len())?;
        Ok(Self { filename })
    }

    pub fn header(&self) -> RequestHeader {
        RequestHeader {
            filename_len: self.filename.len() as u16,
        }
    }

    /// 헤더 + 파일 이름 직렬화
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(REQUEST_HEADER_LEN + self.filename.len());
        buf.put_slice(&self.header().to_bytes());
        buf.put_slice(&self.filename);
        buf.freeze()
    }

    /// 메모리상의 완전한 요청 디코딩 (파일 이름 길이가 정확히 일치해야 함)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = RequestHeader::from_bytes(bytes)?;
        let expected = header.filename_len as usize;
        let body = &bytes[REQUEST_HEADER_LEN..];

        if body.len() < expected {
            return Err(Error::ShortRead {
                expected,
                got: body.len(),
            });
        }
        if body.len() > expected {
            return Err(Error::TrailingData { expected });
        }

        Ok(Self {
            filename: Bytes::copy_from_slice(body),
        })
    }

    /// 로그 출력용 파일 이름
    pub fn filename_lossy(&self) -> String {
        String::from_utf8_lossy(&self.filename).into_owned()
    }
}

/// 응답 헤더 (8바이트)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub status: StatusCode,

    /// 뒤따르는 데이터 길이 (선언 길이)
    pub data_len: u32,
}

impl ResponseHeader {
    /// 헤더 디코딩 및 검증
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < RESPONSE_HEADER_LEN {
            return Err(Error::ShortRead {
                expected: RESPONSE_HEADER_LEN,
                got: bytes.len(),
            });
        }

        let mut buf = &bytes[..RESPONSE_HEADER_LEN];
        check_magic_and_type(&mut buf, MessageType::Response)?;

        let status = StatusCode::try_from(buf.get_u8())?;
        let data_len = buf.get_u32();

        Ok(Self { status, data_len })
    }

    pub fn to_bytes(&self) -> [u8; RESPONSE_HEADER_LEN] {
        let mut out = [0u8; RESPONSE_HEADER_LEN];
        let mut buf = &mut out[..];
        buf.put_u16(MAGIC_NUMBER);
        buf.put_u8(MessageType::Response as u8);
        buf.put_u8(self.status as u8);
        buf.put_u32(self.data_len);
        out
    }
}

/// 파일 응답 메시지
///
/// StatusCode는 데이터가 비어 있지 않을 때만 Success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResponse {
    pub data: Bytes,
}

impl FileResponse {
    pub fn new(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() > u32::MAX as usize {
            return Err(Error::PayloadTooLarge { len: data.len() });
        }
        Ok(Self { data })
    }

    /// 파일을 찾지 못한 경우의 응답
    pub fn not_found() -> Self {
        Self { data: Bytes::new() }
    }

    pub fn status(&self) -> StatusCode {
        if self.data.is_empty() {
            StatusCode::NotFound
        } else {
            StatusCode::Success
        }
    }

    pub fn header(&self) -> ResponseHeader {
        ResponseHeader {
            status: self.status(),
            data_len: self.data.len() as u32,
        }
    }

    /// 헤더 + 데이터 직렬화
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_LEN + self.data.len());
        buf.put_slice(&self.header().to_bytes());
        buf.put_slice(&self.data);
        buf.freeze()
    }

    /// 메모리상의 완전한 응답 디코딩
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = ResponseHeader::from_bytes(bytes)?;
        let body = &bytes[RESPONSE_HEADER_LEN..];

        if body.len() as u64 != header.data_len as u64 {
            return Err(Error::LengthMismatch {
                expected: header.data_len as u64,
                got: body.len() as u64,
            });
        }

        Ok(Self {
            data: Bytes::copy_from_slice(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_layout() {
        let request = FileRequest::new(&b"report.txt"[..]).unwrap();
        let bytes = request.to_bytes();

        assert_eq!(&bytes[..5], &[0x49, 0x7E, 0x01, 0x00, 0x0A]);
        assert_eq!(&bytes[5..], b"report.txt");
    }

    #[test]
    fn test_request_roundtrip_bounds() {
        for len in [1usize, 2, 255, 256, 1023, 1024] {
            let name = vec![b'a'; len];
            let request = FileRequest::new(name.clone()).unwrap();
            let restored = FileRequest::from_bytes(&request.to_bytes()).unwrap();

            assert_eq!(restored.filename.as_ref(), name.as_slice());
            assert_eq!(restored.header().filename_len as usize, len);
        }
    }

    #[test]
    fn test_request_rejects_bad_lengths() {
        assert!(matches!(
            FileRequest::new(Bytes::new()),
            Err(Error::InvalidFilenameLength { len: 0, .. })
        ));
        assert!(matches!(
            FileRequest::new(vec![b'x'; 1025]),
            Err(Error::InvalidFilenameLength { len: 1025, .. })
        ));

        // 헤더 디코더도 같은 경계를 적용
        for (len, ok) in [(0u16, false), (1, true), (1024, true), (1025, false)] {
            let header = RequestHeader { filename_len: len }.to_bytes();
            assert_eq!(RequestHeader::from_bytes(&header).is_ok(), ok, "len={len}");
        }
    }

    #[test]
    fn test_request_header_rejects_magic_and_type() {
        let mut header = RequestHeader { filename_len: 4 }.to_bytes();
        header[0] = 0x12;
        assert!(matches!(
            RequestHeader::from_bytes(&header),
            Err(Error::InvalidMagicNumber { got: 0x127E, .. })
        ));

        let mut header = RequestHeader { filename_len: 4 }.to_bytes();
        header[2] = MessageType::Response as u8;
        assert!(matches!(
            RequestHeader::from_bytes(&header),
            Err(Error::MessageTypeMismatch { expected: 1, got: 2 })
        ));

        assert!(matches!(
            RequestHeader::from_bytes(&header[..3]),
            Err(Error::ShortRead { expected: 5, got: 3 })
        ));
    }

    #[test]
    fn test_request_trailing_bytes() {
        let mut bytes = FileRequest::new(&b"a.txt"[..]).unwrap().to_bytes().to_vec();
        bytes.push(b'!');
        assert!(matches!(
            FileRequest::from_bytes(&bytes),
            Err(Error::TrailingData { expected: 5 })
        ));
    }

    #[test]
    fn test_response_status_follows_data() {
        let empty = FileResponse::new(Bytes::new()).unwrap();
        assert_eq!(empty.status(), StatusCode::NotFound);
        assert_eq!(&empty.to_bytes()[..], &[0x49, 0x7E, 0x02, 0x00, 0, 0, 0, 0]);

        let data: Vec<u8> = (0..=255).collect();
        let response = FileResponse::new(data.clone()).unwrap();
        assert_eq!(response.status(), StatusCode::Success);

        let restored = FileResponse::from_bytes(&response.to_bytes()).unwrap();
        assert_eq!(restored.data.as_ref(), data.as_slice());

        let header = ResponseHeader::from_bytes(&response.to_bytes()).unwrap();
        assert_eq!(header.status, StatusCode::Success);
        assert_eq!(header.data_len, 256);
    }

    #[test]
    fn test_response_header_validation() {
        let good = FileResponse::new(vec![1u8, 2, 3]).unwrap().header().to_bytes();

        let mut bad_magic = good;
        bad_magic[1] = 0x7F;
        assert!(matches!(
            ResponseHeader::from_bytes(&bad_magic),
            Err(Error::InvalidMagicNumber { .. })
        ));

        let mut bad_type = good;
        bad_type[2] = MessageType::Request as u8;
        assert!(matches!(
            ResponseHeader::from_bytes(&bad_type),
            Err(Error::MessageTypeMismatch { expected: 2, got: 1 })
        ));

        let mut bad_status = good;
        bad_status[3] = 7;
        assert!(matches!(
            ResponseHeader::from_bytes(&bad_status),
            Err(Error::InvalidStatusCode(7))
        ));

        assert!(matches!(
            ResponseHeader::from_bytes(&[]),
            Err(Error::ShortRead { expected: 8, got: 0 })
        ));
    }

    #[test]
    fn test_response_length_mismatch() {
        let bytes = FileResponse::new(vec![9u8; 10]).unwrap().to_bytes();
        assert!(matches!(
            FileResponse::from_bytes(&bytes[..bytes.len() - 3]),
            Err(Error::LengthMismatch { expected: 10, got: 7 })
        ));
    }
}
