//! `notify` 크레이트 기반 감시 백엔드
//!
//! 파일 자체가 아니라 파일의 *부모 디렉토리*를 감시합니다. 파일을 직접
//! 감시하면 inotify watch가 inode에 붙기 때문에 unlink 후 재생성되는
//! 로테이션에서 새 파일의 이벤트를 놓칩니다. 디렉토리 감시는 등록된
//! 경로의 Create/Rename/Remove를 로테이션 이후에도 계속 전달합니다.
//!
//! 같은 디렉토리를 공유하는 피드들은 디렉토리 watch 하나를
//! 참조 카운트로 공유합니다.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::{FileWatcher, WatchEvent, WatchEventKind, WatchHandle};
use crate::error::TailError;

/// 핸들 하나의 등록 정보
#[derive(Debug)]
struct Registration {
    /// 이벤트 매칭 키 (정규화된 디렉토리 + 파일명)
    key: PathBuf,
    /// 감시 중인 부모 디렉토리
    dir: PathBuf,
}

/// notify 기반 [`FileWatcher`] 구현
pub struct NotifyWatcher {
    watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    next_handle: u64,
    /// handle -> 등록 정보
    registrations: HashMap<u64, Registration>,
    /// 매칭 키 -> handle
    by_key: HashMap<PathBuf, u64>,
    /// 감시 중인 디렉토리 -> 참조 수
    dir_refs: HashMap<PathBuf, usize>,
}

impl NotifyWatcher {
    /// 새 watcher 세션을 생성합니다.
    pub fn new() -> Result<Self, TailError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // 수신측이 사라졌으면 이벤트를 버림 (셧다운 경로)
            let _ = tx.send(res);
        })
        .map_err(|e| TailError::WatcherInit(e.to_string()))?;

        Ok(Self {
            watcher,
            rx,
            next_handle: 1,
            registrations: HashMap::new(),
            by_key: HashMap::new(),
            dir_refs: HashMap::new(),
        })
    }

    /// 등록/매칭에 쓰는 정규화된 (디렉토리, 키) 쌍을 만듭니다.
    ///
    /// 디렉토리는 canonicalize하여 notify가 보고하는 이벤트 경로와
    /// 같은 형태로 맞춥니다. 파일 자체는 아직 존재하지 않아도 됩니다.
    fn normalize(path: &Path) -> Result<(PathBuf, PathBuf), TailError> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| TailError::Watch {
                path: path.display().to_string(),
                reason: "path has no parent directory".to_owned(),
            })?;
        let file_name = path.file_name().ok_or_else(|| TailError::Watch {
            path: path.display().to_string(),
            reason: "path has no file name".to_owned(),
        })?;
        let dir = parent.canonicalize().unwrap_or_else(|_| parent.to_path_buf());
        let key = dir.join(file_name);
        Ok((dir, key))
    }

    /// notify 이벤트를 등록된 watch 이벤트로 변환합니다.
    fn translate(&self, event: Event, out: &mut Vec<WatchEvent>) {
        let kind = match event.kind {
            EventKind::Create(_) => WatchEventKind::Created,
            EventKind::Remove(_) => WatchEventKind::Removed,
            EventKind::Modify(ModifyKind::Name(_)) => WatchEventKind::Renamed,
            EventKind::Modify(
                ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other,
            ) => WatchEventKind::Modified,
            // Access, Metadata 등은 tail 대상이 아님
            _ => return,
        };

        for path in event.paths {
            // 디렉토리 watch는 디렉토리 내 모든 엔트리를 보고하므로
            // 등록된 경로만 통과시킴
            if let Some(&handle) = self.by_key.get(&path) {
                out.push(WatchEvent {
                    handle: WatchHandle(handle),
                    kind,
                    path,
                });
            }
        }
    }
}

impl FileWatcher for NotifyWatcher {
    fn add_watch(&mut self, path: &Path) -> Result<WatchHandle, TailError> {
        let (dir, key) = Self::normalize(path)?;

        // 같은 경로의 재등록은 기존 핸들을 그대로 반환 (멱등)
        if let Some(&handle) = self.by_key.get(&key) {
            return Ok(WatchHandle(handle));
        }

        match self.dir_refs.get_mut(&dir) {
            Some(count) => *count += 1,
            None => {
                self.watcher
                    .watch(&dir, RecursiveMode::NonRecursive)
                    .map_err(|e| TailError::Watch {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                self.dir_refs.insert(dir.clone(), 1);
            }
        }

        let handle = self.next_handle;
        self.next_handle += 1;
        self.by_key.insert(key.clone(), handle);
        self.registrations.insert(handle, Registration { key, dir });

        Ok(WatchHandle(handle))
    }

    fn remove_watch(&mut self, handle: WatchHandle) -> Result<(), TailError> {
        let registration =
            self.registrations
                .remove(&handle.0)
                .ok_or_else(|| TailError::Watch {
                    path: format!("handle {}", handle.0),
                    reason: "unknown watch handle".to_owned(),
                })?;
        self.by_key.remove(&registration.key);

        if let Some(count) = self.dir_refs.get_mut(&registration.dir) {
            *count -= 1;
            if *count == 0 {
                self.dir_refs.remove(&registration.dir);
                if let Err(e) = self.watcher.unwatch(&registration.dir) {
                    tracing::debug!(
                        dir = %registration.dir.display(),
                        error = %e,
                        "failed to unwatch directory"
                    );
                }
            }
        }

        Ok(())
    }

    async fn next_batch(&mut self) -> Result<Vec<WatchEvent>, TailError> {
        loop {
            let first = self.rx.recv().await.ok_or(TailError::WatcherClosed)?;

            let mut raw = vec![first];
            while let Ok(more) = self.rx.try_recv() {
                raw.push(more);
            }

            let mut batch = Vec::new();
            for result in raw {
                match result {
                    Ok(event) => self.translate(event, &mut batch),
                    Err(e) => tracing::warn!(error = %e, "watch backend error"),
                }
            }

            // 등록되지 않은 경로만 들어있던 배치는 버리고 다시 대기
            if !batch.is_empty() {
                return Ok(batch);
            }
        }
    }
}
