//! 메트릭 상수 — Prometheus 메트릭 이름의 중앙 정의
//!
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`,
//! `metrics::gauge!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logsentry_`
//! - 모듈명: `tail_`, `bus_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (시간), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 피드 레이블 키 (감시 파일 경로)
pub const LABEL_FEED: &str = "feed";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Tail 엔진 메트릭 ─────────────────────────────────────────────

/// Tail: 처리된 로그 라인 수 (counter, label: feed)
pub const TAIL_LINES_TOTAL: &str = "logsentry_tail_lines_total";

/// Tail: 감지된 상태 전이 수 (counter, label: feed)
pub const TAIL_TRANSITIONS_TOTAL: &str = "logsentry_tail_transitions_total";

/// Tail: 처리된 로테이션(reopen) 수 (counter, label: feed)
pub const TAIL_ROTATIONS_TOTAL: &str = "logsentry_tail_rotations_total";

/// Tail: 현재 활성 피드 수 (gauge)
pub const TAIL_FEEDS_ACTIVE: &str = "logsentry_tail_feeds_active";

// ─── 버스 메트릭 ──────────────────────────────────────────────────

/// 버스: 발행 시도 수 (counter, label: result)
pub const BUS_PUBLISHES_TOTAL: &str = "logsentry_bus_publishes_total";

// ─── 데몬 메트릭 ──────────────────────────────────────────────────

/// 데몬: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "logsentry_daemon_uptime_seconds";

/// 데몬: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "logsentry_daemon_build_info";

/// 모든 메트릭의 설명을 등록합니다.
///
/// recorder 설치 직후 한 번 호출합니다. 설명은 Prometheus HELP
/// 라인으로 노출됩니다.
pub fn describe_metrics() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(TAIL_LINES_TOTAL, "Log lines evaluated against state patterns");
    describe_counter!(TAIL_TRANSITIONS_TOTAL, "Derived-topic state transitions detected");
    describe_counter!(TAIL_ROTATIONS_TOTAL, "Feed reopens triggered by rotation events");
    describe_gauge!(TAIL_FEEDS_ACTIVE, "Feeds currently holding an open file handle");
    describe_counter!(BUS_PUBLISHES_TOTAL, "Bus publish attempts by result");
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Daemon uptime in seconds");
    describe_gauge!(DAEMON_BUILD_INFO, "Build information (always 1, version label)");
}
