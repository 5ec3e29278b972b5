#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;
use std::sync::Arc;
use taskhub_core::{Parameters, TaskExecution, TaskStatus};
use taskhub_store::{ExecutionStore, FileExecutionStore, MemoryExecutionStore};

async fn file_store() -> (FileExecutionStore, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileExecutionStore::new(tmp.path().join("executions"))
        .await
        .unwrap();
    (store, tmp)
}

async fn exercise_lifecycle(store: &dyn ExecutionStore) {
    let exec = TaskExecution::new("report", Parameters::new());
    let id = exec.id;
    store.create(&exec).await.unwrap();

    let running = store
        .modify(id, Box::new(|e: &mut TaskExecution| e.start()))
        .await
        .unwrap();
    assert_eq!(running.status, TaskStatus::Running);

    let done = store
        .modify(
            id,
            Box::new(|e: &mut TaskExecution| e.complete(json!({"pages": 3}))),
        )
        .await
        .unwrap();
    assert_eq!(done.status, TaskStatus::Completed);

    let loaded = store.get(id).await.unwrap().unwrap();
    assert_eq!(loaded.result, Some(json!({"pages": 3})));
    assert!(loaded.completed_at.unwrap() >= loaded.started_at.unwrap());

    // A late cancel is rejected and does not touch the stored record.
    let err = store
        .modify(id, Box::new(|e: &mut TaskExecution| e.cancel()))
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());
    let loaded = store.get(id).await.unwrap().unwrap();
    assert_eq!(loaded.status, TaskStatus::Completed);
}

#[tokio::test]
async fn memory_store_lifecycle() {
    let store = MemoryExecutionStore::new();
    exercise_lifecycle(&store).await;
}

#[tokio::test]
async fn file_store_lifecycle() {
    let (store, _tmp) = file_store().await;
    exercise_lifecycle(&store).await;
}

#[tokio::test]
async fn file_store_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("executions");
    let exec = TaskExecution::new("echo", Parameters::new());
    {
        let store = FileExecutionStore::new(dir.clone()).await.unwrap();
        store.create(&exec).await.unwrap();
    }
    let reopened = FileExecutionStore::new(dir).await.unwrap();
    let loaded = reopened.get(exec.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, TaskStatus::Pending);
}

#[tokio::test]
async fn file_store_list_by_status_ignores_foreign_files() {
    let (store, tmp) = file_store().await;
    tokio::fs::write(tmp.path().join("executions").join("notes.txt"), "hello")
        .await
        .unwrap();

    let a = TaskExecution::new("echo", Parameters::new());
    let b = TaskExecution::new("echo", Parameters::new());
    store.create(&a).await.unwrap();
    store.create(&b).await.unwrap();
    store
        .modify(b.id, Box::new(|e: &mut TaskExecution| e.cancel()))
        .await
        .unwrap();

    let pending = store.list_by_status(TaskStatus::Pending).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, a.id);
    let cancelled = store.list_by_status(TaskStatus::Cancelled).await.unwrap();
    assert_eq!(cancelled.len(), 1);
}

#[tokio::test]
async fn concurrent_cancels_have_one_winner() {
    let store = Arc::new(MemoryExecutionStore::new());
    let exec = TaskExecution::new("slow", Parameters::new());
    store.create(&exec).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        let id = exec.id;
        handles.push(tokio::spawn(async move {
            store
                .modify(id, Box::new(|e: &mut TaskExecution| e.cancel()))
                .await
                .is_ok()
        }));
    }
    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}
