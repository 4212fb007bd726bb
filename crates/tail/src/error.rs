//! Tail 엔진 에러 타입
//!
//! [`TailError`]는 감시/패턴/피드 처리에서 발생하는 모든 에러를 표현합니다.
//! `From<TailError> for LogsentryError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 에러의 치명도는 종류와 시점에 따라 다릅니다:
//! - [`TailError::Pattern`], [`TailError::Config`]: 시작 전 치명적
//! - [`TailError::Watch`]: 시작 시 치명적, 로테이션 중에는 경고 후 계속
//! - [`TailError::FileAccess`]: 항상 비치명적 (피드 휴면 전환)
//! - [`TailError::Bus`]: 항상 비치명적 (상태는 유지, at-most-once)

use logsentry_core::error::{BusError, LogsentryError};

/// Tail 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum TailError {
    /// 상태 패턴 정규식 컴파일 실패
    #[error("invalid pattern for state '{state}': {reason}")]
    Pattern {
        /// 문제가 된 상태 라벨
        state: String,
        /// 컴파일 실패 사유
        reason: String,
    },

    /// 엔진 조립/설정 에러
    #[error("tail config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// watch 등록 실패
    #[error("watch registration failed for '{path}': {reason}")]
    Watch {
        /// 등록 대상 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// watch 백엔드 초기화 실패
    #[error("watch backend init failed: {0}")]
    WatcherInit(String),

    /// watch 백엔드가 더 이상 이벤트를 전달하지 않음
    #[error("watch backend closed")]
    WatcherClosed,

    /// 파일 접근 실패 (열기/읽기)
    #[error("file access failed for '{path}': {source}")]
    FileAccess {
        /// 대상 파일 경로
        path: String,
        /// 원인 I/O 에러
        #[source]
        source: std::io::Error,
    },

    /// 버스 발행 에러
    #[error("bus error: {0}")]
    Bus(#[from] BusError),
}

impl From<TailError> for LogsentryError {
    fn from(err: TailError) -> Self {
        LogsentryError::Tail(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_error_display() {
        let err = TailError::Pattern {
            state: "open".to_owned(),
            reason: "unclosed character class".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("open"));
        assert!(msg.contains("unclosed character class"));
    }

    #[test]
    fn file_access_error_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = TailError::FileAccess {
            path: "/var/log/door.log".to_owned(),
            source: io,
        };
        assert!(err.to_string().contains("/var/log/door.log"));
    }

    #[test]
    fn converts_to_logsentry_error() {
        let err = TailError::WatcherClosed;
        let top: LogsentryError = err.into();
        assert!(matches!(top, LogsentryError::Tail(_)));
    }
}
