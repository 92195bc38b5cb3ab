//! 전송 통계

use std::time::{Duration, Instant};

/// 단일 전송 통계
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// 시작 시간
    pub start_time: Instant,

    /// 종료 시간 (완료 전이면 None)
    pub end_time: Option<Instant>,

    /// 총 전송 바이트
    pub total_bytes: u64,

    /// 처리한 청크(read/write 호출) 수
    pub total_chunks: u64,
}

impl TransferStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            total_bytes: 0,
            total_chunks: 0,
        }
    }

    /// 청크 기록
    pub fn record_chunk(&mut self, size: usize) {
        self.total_chunks += 1;
        self.total_bytes += size as u64;
    }

    /// 전송 종료 표시
    pub fn finish(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(Instant::now());
        }
    }

    /// 경과 시간 (종료 전이면 현재까지)
    pub fn elapsed(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// 처리율 (bytes/sec). 측정 불가능할 만큼 짧으면 None
    pub fn throughput(&self) -> Option<f64> {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            return None;
        }
        Some(self.total_bytes as f64 / elapsed)
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        let speed = match self.throughput() {
            Some(bps) => format!("{:.2} MB/s", bps / 1_000_000.0),
            None => "too short to measure".to_string(),
        };
        format!(
            "Size: {} bytes | Time: {:.4}s | Speed: {}",
            self.total_bytes,
            self.elapsed().as_secs_f64(),
            speed,
        )
    }
}

impl Default for TransferStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_finish() {
        let mut stats = TransferStats::new();
        stats.record_chunk(4096);
        stats.record_chunk(100);
        stats.finish();

        assert_eq!(stats.total_bytes, 4196);
        assert_eq!(stats.total_chunks, 2);

        let first = stats.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(stats.elapsed(), first);
    }

    #[test]
    fn test_zero_elapsed_has_no_throughput() {
        let now = Instant::now();
        let stats = TransferStats {
            start_time: now,
            end_time: Some(now),
            total_bytes: 37,
            total_chunks: 1,
        };

        assert!(stats.throughput().is_none());
        assert!(stats.summary().contains("too short to measure"));
    }
}
