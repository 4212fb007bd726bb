//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입

use std::fmt;

use serde::{Deserialize, Serialize};

/// 피드 상태
///
/// 감시 대상 파일 하나의 생명주기를 나타냅니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedStatus {
    /// 생성됨, 아직 열리지 않음
    Idle,
    /// 파일 핸들과 watch가 살아있음
    Active,
    /// 파일을 열 수 없어 휴면 중 (다음 로테이션 이벤트에서 재시도)
    Dormant,
    /// 종료됨 (핸들과 watch 해제)
    Stopped,
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedStatus::Idle => "idle",
            FeedStatus::Active => "active",
            FeedStatus::Dormant => "dormant",
            FeedStatus::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
