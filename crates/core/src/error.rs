//! 에러 타입 — 도메인별 에러 정의

/// Logsentry 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogsentryError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 버스 발행 에러
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// Tail 엔진 에러
    #[error("tail error: {0}")]
    Tail(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
///
/// 설정 에러는 시작 시점에 치명적입니다. 데몬은 `Running` 상태에
/// 진입하기 전에 종료합니다.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 버스 발행 에러
///
/// 발행 실패는 경고로 기록될 뿐 루프를 중단시키지 않습니다.
/// 상태 전이는 이미 기록된 뒤이므로 재전송되지 않습니다 (at-most-once).
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// 브로커 연결 실패
    #[error("bus connect failed: {broker}: {reason}")]
    Connect { broker: String, reason: String },

    /// 메시지 발행 실패
    #[error("publish failed for topic '{topic}': {reason}")]
    Publish { topic: String, reason: String },

    /// 내부 채널 에러 (클라이언트 태스크 종료 등)
    #[error("bus channel error: {0}")]
    Channel(String),
}
