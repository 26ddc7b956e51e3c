//! Snapshot persistence for the workflow store.
//!
//! The store is restored from a JSON snapshot at startup, rewritten after
//! every committed command and written once more at shutdown.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use finplat_core::{StoreSnapshot, WorkflowEngine};
use finplat_shared::{AppError, AppResult, WorkflowConfig};

/// Restores the engine from `path`, or starts empty when there is no file yet.
pub fn load_engine(config: &WorkflowConfig, path: Option<&Path>) -> AppResult<WorkflowEngine> {
    let Some(path) = path.filter(|p| p.exists()) else {
        info!("Starting with an empty store");
        return Ok(WorkflowEngine::new(config));
    };

    let raw = std::fs::read(path)
        .map_err(|e| AppError::Storage(format!("read {}: {e}", path.display())))?;
    let snapshot: StoreSnapshot = serde_json::from_slice(&raw)
        .map_err(|e| AppError::Storage(format!("parse {}: {e}", path.display())))?;
    let engine = WorkflowEngine::from_snapshot(config, snapshot)?;

    let counts = engine.get_counts();
    info!(
        path = %path.display(),
        users = counts.user_count,
        transactions = counts.transaction_count,
        approvals = counts.approval_count,
        "Restored store from snapshot"
    );
    Ok(engine)
}

/// Writes `snapshot` to `path` through a staging file, creating missing directories.
pub fn save_snapshot(snapshot: &StoreSnapshot, path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Storage(format!("create {}: {e}", parent.display())))?;
    }

    let json = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| AppError::Internal(format!("encode snapshot: {e}")))?;
    let staging = path.with_extension("tmp");
    std::fs::write(&staging, json)
        .map_err(|e| AppError::Storage(format!("write {}: {e}", staging.display())))?;
    std::fs::rename(&staging, path)
        .map_err(|e| AppError::Storage(format!("replace {}: {e}", path.display())))?;
    debug!(path = %path.display(), "Snapshot saved");
    Ok(())
}

/// Background task rewriting the snapshot whenever the engine commits.
pub struct SnapshotWriter {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SnapshotWriter {
    /// Waits for any in-flight write, then stops the task.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(err) = self.task.await {
            warn!(error = %err, "Snapshot writer ended abnormally");
        }
    }
}

/// Starts a [`SnapshotWriter`] for `engine`.
///
/// The subscription is taken before this returns, so every command issued
/// afterwards is covered. Bursts of events collapse into a single write.
pub fn spawn_snapshot_writer(engine: Arc<WorkflowEngine>, path: PathBuf) -> SnapshotWriter {
    let mut events = engine.subscribe();
    let (stop, mut stopped) = oneshot::channel();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = &mut stopped => break,
                received = events.recv() => match received {
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                },
            }
            loop {
                match events.try_recv() {
                    Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }

            let snapshot = engine.snapshot();
            let target = path.clone();
            match tokio::task::spawn_blocking(move || save_snapshot(&snapshot, &target)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(error = %err, "Failed to persist snapshot"),
                Err(err) => warn!(error = %err, "Snapshot task failed"),
            }
        }
        debug!("Snapshot writer stopped");
    });
    SnapshotWriter { stop, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use finplat_shared::WalletAddress;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("finplat-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn wallet() -> WalletAddress {
        WalletAddress::parse("0x70997970c51812dc3a010c7d01b50e0d17dc79c8").unwrap()
    }

    #[test]
    fn test_save_creates_missing_directories() {
        let dir = scratch_dir("missing-dirs");
        let path = dir.join("nested/state/snapshot.json");
        assert!(!path.parent().unwrap().exists());

        let config = WorkflowConfig::default();
        let engine = WorkflowEngine::new(&config);
        engine.self_register(&wallet(), "Alice User", "alice.user@company.com").unwrap();

        save_snapshot(&engine.snapshot(), &path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());

        let restored = load_engine(&config, Some(&path)).unwrap();
        assert_eq!(restored.get_counts().user_count, 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_without_file_starts_empty() {
        let dir = scratch_dir("no-file");
        let engine =
            load_engine(&WorkflowConfig::default(), Some(&dir.join("snapshot.json"))).unwrap();
        assert_eq!(engine.get_counts().user_count, 0);
    }

    #[test]
    fn test_load_rejects_corrupt_snapshot() {
        let dir = scratch_dir("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("snapshot.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = load_engine(&WorkflowConfig::default(), Some(&path)).unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_writer_persists_after_commit() {
        let dir = scratch_dir("writer");
        let path = dir.join("data/snapshot.json");
        let config = WorkflowConfig::default();
        let engine = Arc::new(WorkflowEngine::new(&config));
        let writer = spawn_snapshot_writer(Arc::clone(&engine), path.clone());

        engine.self_register(&wallet(), "Alice User", "alice.user@company.com").unwrap();

        let mut restored_users = 0;
        for _ in 0..100 {
            if path.exists() {
                restored_users = load_engine(&config, Some(&path)).unwrap().get_counts().user_count;
                if restored_users == 1 {
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(restored_users, 1);

        writer.shutdown().await;
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
