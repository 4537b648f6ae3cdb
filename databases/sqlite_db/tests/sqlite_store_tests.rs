// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! SQLite document store tests

use sqlite_db::{SqliteCollection, SqliteManager};
use store::{
    StoreIdentifierSource,
    database::{DbManager, DocumentCollection},
    naming::document_id,
};
use warmup::{
    AgentTypeDescriptor, Identifier, IdentifierKind, IdentifierSource,
    WarmupConfig,
};

use futures::StreamExt;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use std::{sync::Arc, thread};

#[test]
fn test_documents_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("agents");
    {
        let manager = SqliteManager::new(&path.to_string_lossy()).unwrap();
        let mut collection = manager.create_collection("orders").unwrap();
        collection.insert("order/1", b"{}").unwrap();
        collection.insert("order/2", b"{}").unwrap();
        drop(collection);
        manager.stop().unwrap();
    }

    let manager = SqliteManager::new(&path.to_string_lossy()).unwrap();
    let collection = manager.collection("orders").unwrap().unwrap();
    assert_eq!(collection.count().unwrap(), 2);
    assert_eq!(collection.page(None, 10).unwrap(), vec!["order/1", "order/2"]);
}

#[test]
fn test_hostile_names_and_ids() {
    let temp_dir = TempDir::new().unwrap();
    let manager =
        SqliteManager::new(temp_dir.path().to_str().unwrap()).unwrap();

    let name = "orders\"; DROP TABLE users; --";
    let mut collection = manager.create_collection(name).unwrap();
    let users: SqliteCollection = manager.create_collection("users").unwrap();
    collection.insert("order/' OR '1'='1", b"{}").unwrap();

    assert_eq!(collection.count().unwrap(), 1);
    assert_eq!(users.count().unwrap(), 0);
    assert!(manager.collection("users").unwrap().is_some());
    assert_eq!(
        collection.page(Some("order/"), 10).unwrap(),
        vec!["order/' OR '1'='1"]
    );
}

#[test]
fn test_concurrent_writers() {
    let temp_dir = TempDir::new().unwrap();
    let manager = Arc::new(
        SqliteManager::new(temp_dir.path().to_str().unwrap()).unwrap(),
    );

    let handles: Vec<_> = (0..3)
        .map(|i| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let name = format!("writers_{}", i);
                let mut collection = manager.create_collection(&name).unwrap();
                for j in 0..50 {
                    collection
                        .insert(&format!("agent/{:03}", j), &[i as u8, j as u8])
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(manager.collection_names().unwrap(), vec![
        "writers_0",
        "writers_1",
        "writers_2"
    ]);
    for i in 0..3 {
        let collection =
            manager.collection(&format!("writers_{}", i)).unwrap().unwrap();
        assert_eq!(collection.count().unwrap(), 50);
        let page = collection.page(Some("agent/047"), 10).unwrap();
        assert_eq!(page, vec!["agent/048", "agent/049"]);
    }
}

#[tokio::test]
async fn test_identifier_source_over_sqlite() {
    let temp_dir = TempDir::new().unwrap();
    let manager =
        SqliteManager::new(temp_dir.path().to_str().unwrap()).unwrap();
    let agent_type = AgentTypeDescriptor::new(
        "Aevatar.Agents.SessionAgent",
        IdentifierKind::Uuid,
        "ISessionAgent",
    );
    let mut collection = manager
        .create_collection("Aevatar.Agents.SessionAgent")
        .unwrap();
    let expected: Vec<Identifier> = (0..30)
        .map(|i| Identifier::Uuid(uuid_from(i)))
        .collect();
    for identifier in &expected {
        collection
            .insert(&document_id(&agent_type, identifier), b"{}")
            .unwrap();
    }

    let mut config = WarmupConfig::default();
    config.store_integration.batch_size = 8;
    config.store_rate_limit.max_operations_per_second = 10_000;
    let source: StoreIdentifierSource<SqliteManager, SqliteCollection> =
        StoreIdentifierSource::new(manager, &config);

    assert!(source.exists(&agent_type).await.unwrap());
    assert_eq!(source.count(&agent_type).await.unwrap(), 30);
    let mut ids: Vec<Identifier> = source
        .stream_identifiers(&agent_type, None, CancellationToken::new())
        .collect()
        .await;
    ids.sort_by_key(|id| id.to_string());
    let mut expected = expected;
    expected.sort_by_key(|id| id.to_string());
    assert_eq!(ids, expected);
}

fn uuid_from(i: u64) -> Uuid {
    Uuid::from_u64_pair(0xfeed, i)
}
