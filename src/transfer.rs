//! 스트림 전송 엔진
//!
//! - 고정 길이 헤더 수신 (부분 수신 누적)
//! - 파일 이름 수신 (선언 길이 + 1바이트 프로브)
//! - 페이로드 청크 수신 후 선언 길이와 대조
//! - 청크 단위 송신
//!
//! 모든 read/write는 타임아웃으로 제한된다. 에러 처리는 호출자가 결정한다.

use std::future::Future;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::stats::TransferStats;
use crate::{Error, Result, Stage};

/// 진행 로그 출력 간격 (청크 수)
const PROGRESS_LOG_INTERVAL: u64 = 256;

/// 타임아웃 적용
async fn with_timeout<F, T>(io_timeout: Duration, stage: Stage, fut: F) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(io_timeout, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(Error::Timeout { stage }),
    }
}

/// 정확히 N바이트 헤더 수신
///
/// 부분 수신은 누적하고, N바이트 전에 스트림이 닫히면 ShortRead.
pub async fn read_header<R, const N: usize>(
    reader: &mut R,
    io_timeout: Duration,
    stage: Stage,
) -> Result<[u8; N]>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; N];
    let mut filled = 0;

    while filled < N {
        let n = with_timeout(io_timeout, stage, reader.read(&mut buf[filled..])).await?;
        if n == 0 {
            return Err(Error::ShortRead {
                expected: N,
                got: filled,
            });
        }
        filled += n;
    }

    Ok(buf)
}

/// 파일 이름 수신
///
/// 버퍼를 선언 길이보다 1바이트 크게 잡고 읽는다. 정확히 선언 길이만큼 받으면 성공,
/// 프로브 바이트까지 채워지면 뒤에 쓰레기가 붙은 요청이다.
pub async fn read_filename<R>(
    reader: &mut R,
    declared_len: usize,
    io_timeout: Duration,
) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::zeroed(declared_len + 1);
    let mut filled = 0;

    while filled < declared_len {
        let read = reader.read(&mut buf[filled..]);
        let n = with_timeout(io_timeout, Stage::Filename, read).await?;
        if n == 0 {
            return Err(Error::ShortRead {
                expected: declared_len,
                got: filled,
            });
        }
        filled += n;
    }

    if filled > declared_len {
        return Err(Error::TrailingData {
            expected: declared_len,
        });
    }

    buf.truncate(declared_len);
    Ok(buf.freeze())
}

/// 페이로드 수신
///
/// 상대가 스트림을 닫을 때까지(0바이트 read) 청크 단위로 읽어 즉시 `writer`에 기록한다.
/// 누적 바이트 수가 선언 길이와 다르면 LengthMismatch.
pub async fn receive_payload<R, W>(
    reader: &mut R,
    writer: &mut W,
    declared_len: u64,
    chunk_size: usize,
    io_timeout: Duration,
) -> Result<TransferStats>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = TransferStats::new();
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        let n = with_timeout(io_timeout, Stage::Payload, reader.read(&mut buf)).await?;
        if n == 0 {
            break;
        }

        stats.record_chunk(n);
        if stats.total_bytes > declared_len {
            return Err(Error::LengthMismatch {
                expected: declared_len,
                got: stats.total_bytes,
            });
        }

        writer.write_all(&buf[..n]).await.map_err(Error::Write)?;

        if stats.total_chunks % PROGRESS_LOG_INTERVAL == 0 {
            debug!("수신 진행: {}/{} bytes", stats.total_bytes, declared_len);
        }
    }

    writer.flush().await.map_err(Error::Write)?;
    stats.finish();

    if stats.total_bytes != declared_len {
        return Err(Error::LengthMismatch {
            expected: declared_len,
            got: stats.total_bytes,
        });
    }

    Ok(stats)
}

/// 헤더 + 페이로드 송신
///
/// 한 번의 논리적 송신이지만 write는 청크 단위로 나눠 각각 타임아웃을 건다.
/// 반환값은 보낸 페이로드 바이트 수 (헤더 제외).
pub async fn send_message<W>(
    writer: &mut W,
    header: &[u8],
    payload: &[u8],
    chunk_size: usize,
    io_timeout: Duration,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let chunk_size = chunk_size.max(1);

    // 헤더와 첫 청크는 한 번에 쓴다
    let first_len = payload.len().min(chunk_size.saturating_sub(header.len()));
    let mut first = Vec::with_capacity(header.len() + first_len);
    first.extend_from_slice(header);
    first.extend_from_slice(&payload[..first_len]);
    with_timeout(io_timeout, Stage::Send, writer.write_all(&first)).await?;

    for chunk in payload[first_len..].chunks(chunk_size) {
        with_timeout(io_timeout, Stage::Send, writer.write_all(chunk)).await?;
    }

    with_timeout(io_timeout, Stage::Send, writer.flush()).await?;
    Ok(payload.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn test_read_header_accumulates_partial_reads() {
        let (mut tx, mut rx) = tokio::io::duplex(64);

        let writer = tokio::spawn(async move {
            tx.write_all(&[0x49, 0x7E]).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.write_all(&[0x01, 0x00, 0x03]).await.unwrap();
            tx
        });

        let header: [u8; 5] = read_header(&mut rx, TIMEOUT, Stage::RequestHeader)
            .await
            .unwrap();
        assert_eq!(header, [0x49, 0x7E, 0x01, 0x00, 0x03]);
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn test_read_header_short_and_timeout() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(&[0x49, 0x7E, 0x02]).await.unwrap();
        drop(tx);

        let result = read_header::<_, 8>(&mut rx, TIMEOUT, Stage::ResponseHeader).await;
        assert!(matches!(result, Err(Error::ShortRead { expected: 8, got: 3 })));

        let (_tx, mut rx) = tokio::io::duplex(64);
        let result = read_header::<_, 5>(&mut rx, TIMEOUT, Stage::RequestHeader).await;
        assert!(matches!(
            result,
            Err(Error::Timeout { stage: Stage::RequestHeader })
        ));
    }

    #[tokio::test]
    async fn test_read_filename_exact_trailing_short() {
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"report.txt").await.unwrap();
        let name = read_filename(&mut rx, 10, TIMEOUT).await.unwrap();
        assert_eq!(name.as_ref(), b"report.txt");

        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"report.txtXYZ").await.unwrap();
        assert!(matches!(
            read_filename(&mut rx, 10, TIMEOUT).await,
            Err(Error::TrailingData { expected: 10 })
        ));

        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(b"repo").await.unwrap();
        drop(tx);
        assert!(matches!(
            read_filename(&mut rx, 10, TIMEOUT).await,
            Err(Error::ShortRead { expected: 10, got: 4 })
        ));
    }

    #[tokio::test]
    async fn test_receive_payload_streams_chunks() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let (mut tx, mut rx) = tokio::io::duplex(1024);

        let sent = data.clone();
        tokio::spawn(async move {
            tx.write_all(&sent).await.unwrap();
        });

        let mut sink = Vec::new();
        let stats = receive_payload(&mut rx, &mut sink, data.len() as u64, 4096, TIMEOUT)
            .await
            .unwrap();

        assert_eq!(sink, data);
        assert_eq!(stats.total_bytes, data.len() as u64);
        assert!(stats.total_chunks >= 3);
    }

    #[tokio::test]
    async fn test_receive_payload_length_mismatch() {
        let (mut tx, mut rx) = tokio::io::duplex(1024);
        tx.write_all(&[7u8; 20]).await.unwrap();
        drop(tx);

        let mut sink = Vec::new();
        let result = receive_payload(&mut rx, &mut sink, 37, 4096, TIMEOUT).await;
        assert!(matches!(
            result,
            Err(Error::LengthMismatch { expected: 37, got: 20 })
        ));

        let (mut tx, mut rx) = tokio::io::duplex(1024);
        tx.write_all(&[7u8; 40]).await.unwrap();
        drop(tx);

        let mut sink = Vec::new();
        let result = receive_payload(&mut rx, &mut sink, 37, 4096, TIMEOUT).await;
        assert!(matches!(
            result,
            Err(Error::LengthMismatch { expected: 37, got: 40 })
        ));
    }

    #[tokio::test]
    async fn test_receive_payload_times_out_on_silent_peer() {
        let (_tx, mut rx) = tokio::io::duplex(64);
        let mut sink = Vec::new();
        let result = receive_payload(&mut rx, &mut sink, 5, 4096, TIMEOUT).await;
        assert!(matches!(result, Err(Error::Timeout { stage: Stage::Payload })));
    }

    #[tokio::test]
    async fn test_send_message_writes_everything() {
        let (mut tx, mut rx) = tokio::io::duplex(16 * 1024);
        let payload = vec![3u8; 9000];

        let sent = send_message(&mut tx, &[1, 2, 3], &payload, 4096, TIMEOUT)
            .await
            .unwrap();
        drop(tx);
        assert_eq!(sent, 9000);

        let mut received = Vec::new();
        rx.read_to_end(&mut received).await.unwrap();
        assert_eq!(&received[..3], &[1, 2, 3]);
        assert_eq!(received.len(), 9003);
    }
}
