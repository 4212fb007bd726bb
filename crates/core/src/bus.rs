//! 버스 발행 capability — 상태 전이를 외부 버스로 내보내는 인터페이스
//!
//! 버스 전송(연결, 재접속, 전송 보장)은 core의 범위가 아닙니다.
//! core는 [`BusPublisher`] trait만 호출하며, 실제 MQTT 클라이언트는
//! `logsentry-daemon`이 구현하여 주입합니다. 테스트에서는 기록용
//! 더블로 대체할 수 있습니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::BusError;

/// 파생 토픽 하나의 상태 전이 기록
///
/// 엣지 트리거 통지의 단위입니다. 동일 토픽에서 상태가 실제로 바뀐
/// 경우에만 생성됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChange {
    /// 파생 토픽 (템플릿 전개 결과, 접두어 포함)
    pub topic: String,
    /// 새 상태 라벨
    pub state: String,
    /// 버스로 내보낼 페이로드 (상태 라벨 또는 설정된 wire 값)
    pub payload: String,
    /// 전이를 만든 피드의 파일 경로
    pub source: String,
    /// 전이 감지 시각
    pub occurred_at: SystemTime,
}

impl StateChange {
    /// 새 상태 전이 기록을 생성합니다.
    pub fn new(
        topic: impl Into<String>,
        state: impl Into<String>,
        payload: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            state: state.into(),
            payload: payload.into(),
            source: source.into(),
            occurred_at: SystemTime::now(),
        }
    }
}

impl fmt::Display for StateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} (payload={} source={})",
            self.topic, self.state, self.payload, self.source,
        )
    }
}

/// 버스 발행 capability
///
/// 호출은 best-effort입니다. 실패는 호출자에게 [`BusError`]로
/// 돌려지지만 상태 기록은 롤백되지 않습니다 (at-most-once 통지).
pub trait BusPublisher: Send {
    /// 상태 전이 한 건을 버스로 발행합니다.
    fn publish(
        &mut self,
        change: &StateChange,
    ) -> impl Future<Output = Result<(), BusError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_change_display() {
        let change = StateChange::new("door/3", "open", "1", "/var/log/door.log");
        let display = change.to_string();
        assert!(display.contains("door/3"));
        assert!(display.contains("open"));
        assert!(display.contains("/var/log/door.log"));
    }

    #[test]
    fn state_change_records_timestamp() {
        let change = StateChange::new("a", "b", "b", "c");
        assert!(change.occurred_at <= SystemTime::now());
    }
}
