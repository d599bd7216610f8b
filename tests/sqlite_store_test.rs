//! Tests for the SQLite store backend.

use std::sync::Arc;

use tempfile::NamedTempFile;

use two_duel::{
    MatchmakingConfig, Matchmaker, MemoryQueue, Room, RoomStatus, RoomStore, SqliteStore, User,
    UserStore,
};

/// Opens a store on a temporary file; the file handle must stay in scope.
async fn setup_test_db() -> (NamedTempFile, SqliteStore) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    let store = SqliteStore::open(db_path).await.expect("Failed to open store");
    (db_file, store)
}

#[tokio::test]
async fn test_put_and_get_room() {
    let (_db, store) = setup_test_db().await;
    let room = Room::new(
        "r1".to_string(),
        RoomStatus::Playing,
        "alice".to_string(),
        "bob".to_string(),
        vec![10, 3, 5],
    );

    store.put_room(room.clone()).await.expect("Put failed");
    let found = store.get_room("r1").await.expect("Get failed");

    assert_eq!(found, Some(room));
}

#[tokio::test]
async fn test_get_missing_room() {
    let (_db, store) = setup_test_db().await;
    assert!(store.get_room("nope").await.expect("Get failed").is_none());
}

#[tokio::test]
async fn test_attach_challenger_is_guarded() {
    let (_db, store) = setup_test_db().await;
    store
        .put_room(Room::waiting("r1".to_string(), "alice".to_string()))
        .await
        .expect("Put failed");

    let first = store
        .attach_challenger("r1", "bob", RoomStatus::Waiting, RoomStatus::Preparing)
        .await
        .expect("Attach failed");
    let second = store
        .attach_challenger("r1", "carol", RoomStatus::Waiting, RoomStatus::Preparing)
        .await
        .expect("Attach failed");
    let missing = store
        .attach_challenger("r2", "dave", RoomStatus::Waiting, RoomStatus::Preparing)
        .await
        .expect("Attach failed");

    assert!(first);
    assert!(!second);
    assert!(!missing);
    let room = store
        .get_room("r1")
        .await
        .expect("Get failed")
        .expect("Room missing");
    assert_eq!(room.user2_id(), "bob");
    assert_eq!(*room.status(), RoomStatus::Preparing);
}

#[tokio::test]
async fn test_set_problem_is_guarded() {
    let (_db, store) = setup_test_db().await;
    store
        .put_room(Room::new(
            "r1".to_string(),
            RoomStatus::Preparing,
            "alice".to_string(),
            "bob".to_string(),
            Vec::new(),
        ))
        .await
        .expect("Put failed");

    assert!(
        store
            .set_problem("r1", &[4, 1, 1], RoomStatus::Preparing, RoomStatus::Playing)
            .await
            .expect("Set failed")
    );
    assert!(
        !store
            .set_problem("r1", &[9, 9], RoomStatus::Preparing, RoomStatus::Playing)
            .await
            .expect("Set failed")
    );

    let room = store
        .get_room("r1")
        .await
        .expect("Get failed")
        .expect("Room missing");
    assert_eq!(room.problem(), &vec![4, 1, 1]);
    assert_eq!(*room.status(), RoomStatus::Playing);
}

#[tokio::test]
async fn test_user_lifecycle() {
    let (_db, store) = setup_test_db().await;
    store
        .put_user(User::joined("alice".to_string(), "r1".to_string()))
        .await
        .expect("Put failed");

    store.mark_solved("alice").await.expect("Mark failed");
    let user = store
        .get_user("alice")
        .await
        .expect("Get failed")
        .expect("User missing");
    assert!(*user.solved());
    assert_eq!(user.room_id(), "r1");

    store.delete_user("alice").await.expect("Delete failed");
    store.delete_user("alice").await.expect("Second delete failed");
    assert!(store.get_user("alice").await.expect("Get failed").is_none());
}

#[tokio::test]
async fn test_mark_solved_does_not_create_user() {
    let (_db, store) = setup_test_db().await;
    store.mark_solved("ghost").await.expect("Mark failed");
    assert!(store.get_user("ghost").await.expect("Get failed").is_none());
}

#[tokio::test]
async fn test_delete_room() {
    let (_db, store) = setup_test_db().await;
    store
        .put_room(Room::waiting("r1".to_string(), "alice".to_string()))
        .await
        .expect("Put failed");

    store.delete_room("r1").await.expect("Delete failed");
    store.delete_room("r1").await.expect("Second delete failed");
    assert!(store.get_room("r1").await.expect("Get failed").is_none());
}

#[tokio::test]
async fn test_reopen_keeps_records() {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let store = SqliteStore::open(db_path.clone()).await.expect("Open failed");
    store
        .put_room(Room::waiting("r1".to_string(), "alice".to_string()))
        .await
        .expect("Put failed");
    drop(store);

    let reopened = SqliteStore::open(db_path).await.expect("Reopen failed");
    assert!(reopened.get_room("r1").await.expect("Get failed").is_some());
}

#[tokio::test]
async fn test_matchmaking_over_sqlite() {
    let (_db, store) = setup_test_db().await;
    let store = Arc::new(store);
    let matchmaker = Matchmaker::new(
        store.clone(),
        store.clone(),
        Arc::new(MemoryQueue::new()),
        MatchmakingConfig::new(30, 0, 3),
    );

    let first = matchmaker.join("alice").await.expect("Join failed");
    let second = matchmaker.join("bob").await.expect("Join failed");

    assert_eq!(first, second);
    let room = store
        .get_room(&first)
        .await
        .expect("Get failed")
        .expect("Room missing");
    assert_eq!(room.members().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_joins_over_sqlite() {
    let (_db, store) = setup_test_db().await;
    let store = Arc::new(store);
    let matchmaker = Matchmaker::new(
        store.clone(),
        store.clone(),
        Arc::new(MemoryQueue::new()),
        MatchmakingConfig::new(30, 0, 3),
    );

    let mut handles = Vec::new();
    for i in 0..40 {
        let matchmaker = matchmaker.clone();
        handles.push(tokio::spawn(async move {
            matchmaker.join(&format!("conn-{}", i)).await
        }));
    }
    for handle in handles {
        handle.await.expect("Task panicked").expect("Join failed");
    }

    for i in 0..40 {
        let conn = format!("conn-{}", i);
        let user = store
            .get_user(&conn)
            .await
            .expect("Get failed")
            .expect("User missing");
        let room = store
            .get_room(user.room_id())
            .await
            .expect("Get failed")
            .expect("Room missing");
        assert!(room.is_member(&conn));
        assert!(room.members().len() <= 2);
    }
}
