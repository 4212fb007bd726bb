//! 리액터 -- 감시 이벤트 루프와 피드 생명주기 관리
//!
//! [`Reactor`]는 watcher 세션, 피드 컬렉션, 버스 발행 capability를
//! 소유합니다. 단일 태스크에서 이벤트를 전달 순서대로 디스패치하므로
//! 피드 상태에 대한 잠금이 필요 없습니다. 발행은 루프 태스크에서
//! 동기적으로 await되며, 느린 발행이 전체 피드의 이벤트 처리를
//! 지연시키는 것은 의도된 단순화입니다.
//!
//! # 상태 전이
//! ```text
//! Idle -> Running -> ShuttingDown -> Stopped
//! ```

use std::collections::HashMap;

use metrics::gauge;
use tokio_util::sync::CancellationToken;

use logsentry_core::bus::BusPublisher;
use logsentry_core::config::TailConfig;
use logsentry_core::metrics as m;
use logsentry_core::types::FeedStatus;

use crate::error::TailError;
use crate::feed::Feed;
use crate::watcher::{FileWatcher, WatchEvent, WatchEventKind, WatchHandle};

/// 리액터 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReactorState {
    /// 초기화됨, 아직 시작하지 않음
    Idle,
    /// 이벤트 루프 실행 중
    Running,
    /// 종료 진행 중
    ShuttingDown,
    /// 종료됨
    Stopped,
}

/// 감시 이벤트 루프
///
/// # 사용 예시
/// ```ignore
/// let mut reactor = Reactor::builder()
///     .config(config.tail.clone())
///     .topic_prefix(&config.bus.topic_prefix)
///     .watcher(NotifyWatcher::new()?)
///     .bus(publisher)
///     .build()?;
///
/// reactor.start().await?;
/// reactor.run().await?;
/// ```
pub struct Reactor<W, B> {
    watcher: W,
    bus: B,
    feeds: Vec<Feed>,
    /// watch 핸들 -> 소유 피드 인덱스
    by_handle: HashMap<WatchHandle, usize>,
    replay_existing: bool,
    state: ReactorState,
    shutdown: CancellationToken,
}

impl<W: FileWatcher, B: BusPublisher> Reactor<W, B> {
    /// 새 빌더를 생성합니다.
    pub fn builder() -> ReactorBuilder<W, B> {
        ReactorBuilder::new()
    }

    /// 현재 상태 이름을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            ReactorState::Idle => "idle",
            ReactorState::Running => "running",
            ReactorState::ShuttingDown => "shutting_down",
            ReactorState::Stopped => "stopped",
        }
    }

    /// 등록된 피드 수를 반환합니다.
    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }

    /// 활성(파일 핸들 보유) 피드 수를 반환합니다.
    pub fn active_feed_count(&self) -> usize {
        self.feeds
            .iter()
            .filter(|f| *f.status() == FeedStatus::Active)
            .count()
    }

    /// 외부에서 종료를 요청할 수 있는 토큰을 반환합니다.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// 모든 피드를 열고 감시를 시작합니다 (`Idle -> Running`).
    ///
    /// 피드 설정 순서대로: `reopen()` 후, replay가 켜져 있으면 기존
    /// 내용을 한 번 `process()`하고, 남은 바이트를 정확히 한 번 버려
    /// 라이브 tail 기준점을 만듭니다. replay된 라인이 감시 시작 후
    /// 중복 집계되는 일은 없습니다.
    ///
    /// # Errors
    ///
    /// watch 등록 실패는 시작 시 치명적입니다. 파일이 없는 피드는
    /// 휴면 상태로 두고 계속 진행합니다.
    pub async fn start(&mut self) -> Result<(), TailError> {
        if self.state != ReactorState::Idle {
            return Err(TailError::Config {
                field: "reactor".to_owned(),
                reason: format!("cannot start from state '{}'", self.state_name()),
            });
        }

        for idx in 0..self.feeds.len() {
            let feed = &mut self.feeds[idx];
            match feed.reopen(&mut self.watcher) {
                Ok(()) => {}
                Err(TailError::FileAccess { path, source }) => {
                    tracing::warn!(
                        path = %path,
                        error = %source,
                        "feed file unavailable at startup; feed is dormant"
                    );
                }
                // watch 등록 실패는 복구 불가 -- 시작 중단
                Err(e) => return Err(e),
            }

            if self.replay_existing
                && let Err(e) = feed.process(&mut self.bus).await
            {
                tracing::warn!(path = %feed.path().display(), error = %e, "startup replay failed");
            }

            match feed.skip_existing().await {
                Ok(skipped) if skipped > 0 => {
                    tracing::debug!(
                        path = %feed.path().display(),
                        bytes = skipped,
                        "discarded unread bytes to establish tail point"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %feed.path().display(), error = %e, "tail point setup failed");
                }
            }

            if let Some(handle) = feed.watch_handle() {
                self.by_handle.insert(handle, idx);
            }
        }

        gauge!(m::TAIL_FEEDS_ACTIVE).set(self.active_feed_count() as f64);
        self.state = ReactorState::Running;
        tracing::info!(
            feeds = self.feed_count(),
            active = self.active_feed_count(),
            replay = self.replay_existing,
            "reactor started"
        );
        Ok(())
    }

    /// 이벤트 루프를 실행합니다.
    ///
    /// 종료 토큰이 취소되거나 watcher 세션이 닫힐 때까지 블로킹합니다.
    /// 어느 경로로든 빠져나가면 모든 피드 핸들과 watch 등록을 해제합니다.
    pub async fn run(&mut self) -> Result<(), TailError> {
        if self.state != ReactorState::Running {
            return Err(TailError::Config {
                field: "reactor".to_owned(),
                reason: format!("cannot run from state '{}'", self.state_name()),
            });
        }

        let shutdown = self.shutdown.clone();
        let result = loop {
            let batch = tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                batch = self.watcher.next_batch() => batch,
            };

            match batch {
                Ok(events) => {
                    for event in events {
                        self.dispatch(event).await;
                    }
                }
                Err(TailError::WatcherClosed) => {
                    tracing::error!("watch backend closed; stopping reactor");
                    break Err(TailError::WatcherClosed);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "watch batch failed");
                }
            }
        };

        self.stop();
        result
    }

    /// 이벤트 하나를 소유 피드로 디스패치합니다.
    ///
    /// 알 수 없는(stale) 핸들의 이벤트는 무시합니다. 로테이션류 이벤트는
    /// 해당 핸들의 이후 modify 이벤트보다 먼저 처리되므로, 낡은 커서로
    /// 새 파일을 읽는 일이 없습니다.
    async fn dispatch(&mut self, event: WatchEvent) {
        let Some(&idx) = self.by_handle.get(&event.handle) else {
            tracing::trace!(?event, "event for stale watch handle ignored");
            return;
        };

        match event.kind {
            WatchEventKind::Modified => {
                if let Err(e) = self.feeds[idx].process(&mut self.bus).await {
                    tracing::warn!(
                        path = %self.feeds[idx].path().display(),
                        error = %e,
                        "feed processing failed"
                    );
                }
            }
            WatchEventKind::Renamed | WatchEventKind::Created | WatchEventKind::Removed => {
                self.handle_rotation(idx, event).await;
            }
        }
    }

    /// 로테이션류 이벤트를 처리합니다: reopen하고 핸들 매핑을 갱신합니다.
    async fn handle_rotation(&mut self, idx: usize, event: WatchEvent) {
        let feed = &mut self.feeds[idx];
        tracing::info!(
            path = %feed.path().display(),
            kind = ?event.kind,
            "rotation detected; reopening feed"
        );
        counter_rotation(feed);

        self.by_handle.remove(&event.handle);

        match feed.reopen(&mut self.watcher) {
            Ok(()) => {}
            Err(TailError::FileAccess { path, source }) => {
                tracing::warn!(
                    path = %path,
                    error = %source,
                    "file missing after rotation; feed is dormant until recreated"
                );
            }
            Err(e) => {
                // 등록 실패 -- 가능하면 다음 이벤트에서 재시도
                tracing::warn!(
                    path = %feed.path().display(),
                    error = %e,
                    "watch re-registration failed during rotation"
                );
            }
        }

        if let Some(handle) = feed.watch_handle() {
            self.by_handle.insert(handle, idx);
        }
        gauge!(m::TAIL_FEEDS_ACTIVE).set(self.active_feed_count() as f64);
    }

    /// 모든 피드 핸들과 watch 등록을 해제합니다
    /// (`Running -> ShuttingDown -> Stopped`).
    fn stop(&mut self) {
        self.state = ReactorState::ShuttingDown;
        for feed in &mut self.feeds {
            feed.close(&mut self.watcher);
        }
        self.by_handle.clear();
        gauge!(m::TAIL_FEEDS_ACTIVE).set(0.0);
        self.state = ReactorState::Stopped;
        tracing::info!("reactor stopped");
    }
}

fn counter_rotation(feed: &Feed) {
    metrics::counter!(
        m::TAIL_ROTATIONS_TOTAL,
        m::LABEL_FEED => feed.path().display().to_string()
    )
    .increment(1);
}

/// 리액터 빌더
pub struct ReactorBuilder<W, B> {
    config: TailConfig,
    topic_prefix: String,
    watcher: Option<W>,
    bus: Option<B>,
}

impl<W: FileWatcher, B: BusPublisher> ReactorBuilder<W, B> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: TailConfig::default(),
            topic_prefix: String::new(),
            watcher: None,
            bus: None,
        }
    }

    /// 감시 설정을 지정합니다.
    pub fn config(mut self, config: TailConfig) -> Self {
        self.config = config;
        self
    }

    /// 파생 토픽 접두어를 지정합니다.
    pub fn topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    /// watcher 세션을 주입합니다.
    pub fn watcher(mut self, watcher: W) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// 버스 발행 capability를 주입합니다.
    pub fn bus(mut self, bus: B) -> Self {
        self.bus = Some(bus);
        self
    }

    /// 피드를 조립하고 리액터를 생성합니다.
    ///
    /// 모든 피드의 패턴이 여기서 컴파일됩니다. 유효하지 않은 패턴은
    /// [`TailError::Pattern`]으로 실패합니다 (시작 전 치명적).
    pub fn build(self) -> Result<Reactor<W, B>, TailError> {
        let watcher = self.watcher.ok_or_else(|| TailError::Config {
            field: "watcher".to_owned(),
            reason: "builder requires a watcher".to_owned(),
        })?;
        let bus = self.bus.ok_or_else(|| TailError::Config {
            field: "bus".to_owned(),
            reason: "builder requires a bus publisher".to_owned(),
        })?;

        let feeds = self
            .config
            .feeds
            .iter()
            .map(|feed| Feed::from_config(feed, &self.topic_prefix))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Reactor {
            watcher,
            bus,
            feeds,
            by_handle: HashMap::new(),
            replay_existing: self.config.replay_existing,
            state: ReactorState::Idle,
            shutdown: CancellationToken::new(),
        })
    }
}

impl<W: FileWatcher, B: BusPublisher> Default for ReactorBuilder<W, B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use logsentry_core::bus::StateChange;
    use logsentry_core::config::{FeedConfig, StateRule};
    use logsentry_core::error::BusError;

    struct StubWatcher;

    impl FileWatcher for StubWatcher {
        fn add_watch(&mut self, _path: &Path) -> Result<WatchHandle, TailError> {
            Ok(WatchHandle(1))
        }

        fn remove_watch(&mut self, _handle: WatchHandle) -> Result<(), TailError> {
            Ok(())
        }

        async fn next_batch(&mut self) -> Result<Vec<WatchEvent>, TailError> {
            Err(TailError::WatcherClosed)
        }
    }

    struct NullBus;

    impl BusPublisher for NullBus {
        async fn publish(&mut self, _change: &StateChange) -> Result<(), BusError> {
            Ok(())
        }
    }

    fn door_config(file: &str) -> TailConfig {
        TailConfig {
            replay_existing: false,
            feeds: vec![FeedConfig {
                file: file.to_owned(),
                topic: "door/{id}".to_owned(),
                states: vec![StateRule {
                    state: "open".to_owned(),
                    pattern: r"^DOOR (?<id>\d+) OPEN$".to_owned(),
                    payload: None,
                }],
            }],
        }
    }

    #[test]
    fn builder_requires_watcher_and_bus() {
        let result = ReactorBuilder::<StubWatcher, NullBus>::new()
            .config(door_config("/var/log/door.log"))
            .bus(NullBus)
            .build();
        assert!(matches!(result, Err(TailError::Config { field, .. }) if field == "watcher"));

        let result = ReactorBuilder::<StubWatcher, NullBus>::new()
            .config(door_config("/var/log/door.log"))
            .watcher(StubWatcher)
            .build();
        assert!(matches!(result, Err(TailError::Config { field, .. }) if field == "bus"));
    }

    #[test]
    fn builder_compiles_patterns_eagerly() {
        let mut config = door_config("/var/log/door.log");
        config.feeds[0].states[0].pattern = "[unclosed".to_owned();

        let result = ReactorBuilder::new()
            .config(config)
            .watcher(StubWatcher)
            .bus(NullBus)
            .build();
        assert!(matches!(result, Err(TailError::Pattern { .. })));
    }

    #[test]
    fn new_reactor_is_idle() {
        let reactor = ReactorBuilder::new()
            .config(door_config("/var/log/door.log"))
            .watcher(StubWatcher)
            .bus(NullBus)
            .build()
            .unwrap();
        assert_eq!(reactor.state_name(), "idle");
        assert_eq!(reactor.feed_count(), 1);
        assert_eq!(reactor.active_feed_count(), 0);
    }

    #[tokio::test]
    async fn run_before_start_is_rejected() {
        let mut reactor = ReactorBuilder::new()
            .config(door_config("/var/log/door.log"))
            .watcher(StubWatcher)
            .bus(NullBus)
            .build()
            .unwrap();
        assert!(reactor.run().await.is_err());
    }

    #[tokio::test]
    async fn missing_feed_file_leaves_reactor_running_with_dormant_feed() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-yet.log");

        let mut reactor = ReactorBuilder::new()
            .config(door_config(&missing.display().to_string()))
            .watcher(StubWatcher)
            .bus(NullBus)
            .build()
            .unwrap();

        reactor.start().await.unwrap();
        assert_eq!(reactor.state_name(), "running");
        assert_eq!(reactor.active_feed_count(), 0);
    }
}
