#![doc = include_str!("../README.md")]
//!
//! # 아키텍처
//!
//! ```text
//! FileWatcher -> Reactor -> Feed -> PatternSet -> BusPublisher
//!     |             |         |          |
//!  notify 백엔드  이벤트 루프  커서/상태  정규식 + 템플릿
//! ```

pub mod error;
pub mod feed;
pub mod pattern;
pub mod reactor;
pub mod watcher;

// --- 주요 타입 re-export ---

// 에러
pub use error::TailError;

// 패턴
pub use pattern::{PatternMatch, PatternSet};

// 피드
pub use feed::Feed;

// 감시
pub use watcher::{FileWatcher, NotifyWatcher, WatchEvent, WatchEventKind, WatchHandle};

// 리액터
pub use reactor::{Reactor, ReactorBuilder};
