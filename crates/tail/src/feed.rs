//! 피드 -- 감시 파일 하나의 읽기 커서와 파생 토픽 상태
//!
//! [`Feed`]는 파일 하나를 소유합니다: 현재 읽기 위치(열린 핸들의 커서),
//! 파생 토픽별 마지막 상태 맵, 그리고 패턴 집합. 전이 감지는 오직
//! 상태 맵과의 비교로만 수행하며 과거 라인을 다시 읽지 않습니다.
//!
//! # 로테이션 복구
//! [`Feed::reopen`]은 기존 핸들과 watch 등록을 해제한 뒤 파일을 처음부터
//! 다시 엽니다. 파일이 없으면 피드는 휴면(Dormant) 상태가 되고, 등록은
//! 유지되어 이후 Create 이벤트에서 복구됩니다.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use metrics::counter;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use logsentry_core::bus::{BusPublisher, StateChange};
use logsentry_core::config::FeedConfig;
use logsentry_core::metrics as m;
use logsentry_core::types::FeedStatus;

use crate::error::TailError;
use crate::pattern::PatternSet;
use crate::watcher::{FileWatcher, WatchHandle};

/// 감시 파일 하나의 상태
pub struct Feed {
    /// 감시 파일 경로
    path: PathBuf,
    /// 메트릭/로그/StateChange용 경로 문자열
    source: String,
    /// 파생 토픽 템플릿
    topic_template: String,
    /// 토픽 접두어 (전개 결과 앞에 붙음)
    topic_prefix: String,
    /// 컴파일된 상태 패턴 집합
    patterns: PatternSet,
    /// 열린 파일 핸들 -- 읽기 커서는 핸들의 read 위치가 그대로 담당
    reader: Option<File>,
    /// 파생 토픽 -> 현재 상태 라벨
    states: HashMap<String, String>,
    /// 현재 watch 등록 핸들
    handle: Option<WatchHandle>,
    /// 생명주기 상태
    status: FeedStatus,
}

impl Feed {
    /// 피드 설정에서 피드를 생성합니다.
    ///
    /// 패턴 컴파일 실패는 [`TailError::Pattern`]으로 전파됩니다
    /// (시작 전 치명적).
    pub fn from_config(config: &FeedConfig, topic_prefix: &str) -> Result<Self, TailError> {
        let patterns = PatternSet::compile(&config.states)?;
        let path = PathBuf::from(&config.file);
        Ok(Self {
            source: path.display().to_string(),
            path,
            topic_template: config.topic.clone(),
            topic_prefix: topic_prefix.to_owned(),
            patterns,
            reader: None,
            states: HashMap::new(),
            handle: None,
            status: FeedStatus::Idle,
        })
    }

    /// 감시 파일 경로를 반환합니다.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 현재 생명주기 상태를 반환합니다.
    pub fn status(&self) -> &FeedStatus {
        &self.status
    }

    /// 현재 watch 등록 핸들을 반환합니다.
    pub fn watch_handle(&self) -> Option<WatchHandle> {
        self.handle
    }

    /// 파생 토픽의 현재 상태를 반환합니다.
    pub fn current_state(&self, topic: &str) -> Option<&str> {
        self.states.get(topic).map(String::as_str)
    }

    /// 파일 핸들을 다시 획득하고 watch를 재등록합니다.
    ///
    /// 시작 시와 로테이션(이동/재생성) 시 호출됩니다. 이전 watch 등록을
    /// 먼저 해제하므로 반복되는 로테이션에서도 등록이 누적되지 않습니다.
    /// 파일 열기에 실패해도 새 watch 등록은 유지되어, 이후 파일이
    /// 재생성되면 Create 이벤트로 복구할 수 있습니다.
    pub fn reopen(&mut self, watcher: &mut impl FileWatcher) -> Result<(), TailError> {
        // 이전 핸들은 실패 경로에서도 누수되지 않도록 먼저 해제
        if let Some(handle) = self.handle.take()
            && let Err(e) = watcher.remove_watch(handle)
        {
            tracing::debug!(path = %self.source, error = %e, "stale watch removal failed");
        }
        self.reader = None;

        self.handle = Some(watcher.add_watch(&self.path)?);

        match std::fs::File::open(&self.path) {
            Ok(file) => {
                self.reader = Some(File::from_std(file));
                self.status = FeedStatus::Active;
                Ok(())
            }
            Err(e) => {
                self.status = FeedStatus::Dormant;
                Err(TailError::FileAccess {
                    path: self.source.clone(),
                    source: e,
                })
            }
        }
    }

    /// 현재 커서부터 EOF까지 읽어서 버립니다.
    ///
    /// 시작 시 (선택적 replay 후) 정확히 한 번 호출되어 라이브 tail
    /// 기준점을 만듭니다. replay된 라인이 감시 시작 후 중복 처리되는
    /// 것을 막습니다.
    pub async fn skip_existing(&mut self) -> Result<u64, TailError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(0);
        };
        let mut discard = Vec::new();
        let n = reader.read_to_end(&mut discard).await.map_err(|e| {
            TailError::FileAccess {
                path: self.source.clone(),
                source: e,
            }
        })?;
        Ok(n as u64)
    }

    /// 마지막 읽기 이후 추가된 바이트를 전부 읽어 라인 단위로 처리합니다.
    ///
    /// 라인은 `\n` 기준으로 나누고, 앞뒤 공백을 제거한 뒤 비어있지 않은
    /// 것만 평가합니다. 처리 후 커서는 핸들의 read 위치를 통해 암묵적으로
    /// 새 EOF를 가리킵니다. 발생한 전이 목록을 반환합니다.
    pub async fn process(
        &mut self,
        bus: &mut impl BusPublisher,
    ) -> Result<Vec<StateChange>, TailError> {
        let buf = {
            let Some(reader) = self.reader.as_mut() else {
                tracing::debug!(path = %self.source, "process skipped: feed is dormant");
                return Ok(Vec::new());
            };
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await.map_err(|e| {
                TailError::FileAccess {
                    path: self.source.clone(),
                    source: e,
                }
            })?;
            buf
        };

        if buf.is_empty() {
            return Ok(Vec::new());
        }

        let text = String::from_utf8_lossy(&buf);
        let mut changes = Vec::new();
        for line in text.split('\n') {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            counter!(m::TAIL_LINES_TOTAL, m::LABEL_FEED => self.source.clone()).increment(1);
            self.process_line(line, &mut *bus, &mut changes).await;
        }

        Ok(changes)
    }

    /// 라인 하나를 패턴 집합으로 평가합니다.
    ///
    /// *모든* 패턴을 선언 순서대로 독립 평가합니다. 매칭마다 토픽
    /// 템플릿을 전개하고, 해당 파생 토픽의 상태가 실제로 바뀐 경우에만
    /// 전이를 기록하고 발행을 트리거합니다 (엣지 트리거). 같은 라인이
    /// 서로 다른 토픽으로 전개되면 한 라인이 여러 전이를 만들 수 있습니다.
    async fn process_line(
        &mut self,
        line: &str,
        bus: &mut impl BusPublisher,
        changes: &mut Vec<StateChange>,
    ) {
        let matched: Vec<(String, String, String)> = self
            .patterns
            .matches(line)
            .map(|m| {
                (
                    m.label().to_owned(),
                    m.wire_payload().to_owned(),
                    m.expand(&self.topic_template),
                )
            })
            .collect();

        for (label, payload, expanded) in matched {
            let topic = format!("{}{}", self.topic_prefix, expanded);

            if self.states.get(&topic).is_some_and(|current| *current == label) {
                // 상태 불변 -- 통지 없음
                continue;
            }

            self.states.insert(topic.clone(), label.clone());
            let change = StateChange::new(topic, label, payload, self.source.clone());

            if let Err(e) = self.trigger(&change, &mut *bus).await {
                // 발행 실패는 비치명적이며 상태는 롤백하지 않음:
                // 같은 상태가 다시 와도 재통지되지 않는 at-most-once 정책
                tracing::warn!(
                    topic = %change.topic,
                    error = %e,
                    "publish failed; transition stays recorded"
                );
            }
            changes.push(change);
        }
    }

    /// 전이 한 건을 버스로 발행하고 로그를 남깁니다.
    async fn trigger(
        &self,
        change: &StateChange,
        bus: &mut impl BusPublisher,
    ) -> Result<(), TailError> {
        tracing::info!(
            topic = %change.topic,
            state = %change.state,
            source = %change.source,
            "state transition"
        );
        counter!(m::TAIL_TRANSITIONS_TOTAL, m::LABEL_FEED => self.source.clone()).increment(1);

        match bus.publish(change).await {
            Ok(()) => {
                counter!(m::BUS_PUBLISHES_TOTAL, m::LABEL_RESULT => "success").increment(1);
                Ok(())
            }
            Err(e) => {
                counter!(m::BUS_PUBLISHES_TOTAL, m::LABEL_RESULT => "failure").increment(1);
                Err(e.into())
            }
        }
    }

    /// 핸들과 watch 등록을 해제합니다 (종료 경로).
    pub fn close(&mut self, watcher: &mut impl FileWatcher) {
        if let Some(handle) = self.handle.take()
            && let Err(e) = watcher.remove_watch(handle)
        {
            tracing::debug!(path = %self.source, error = %e, "watch removal failed on close");
        }
        self.reader = None;
        self.status = FeedStatus::Stopped;
    }
}
