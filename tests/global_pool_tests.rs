//! Runs as its own binary so the process-wide pool starts out empty.

mod common;

use common::{Event, RecordingConnector, User, config};
use minorm::{FindOptions, Model, OrmError, create_pool, global_pool};

#[tokio::test]
async fn test_global_pool_lifecycle() {
    assert!(matches!(global_pool(), Err(OrmError::PoolNotInitialized)));

    let connector = RecordingConnector::new();
    let pool = create_pool(config(), connector.clone()).await.unwrap();
    assert!(std::ptr::eq(pool, global_pool().unwrap()));

    let err = create_pool(config(), connector.clone()).await.err().unwrap();
    assert!(matches!(err, OrmError::PoolAlreadyInitialized));

    User::find_all(global_pool().unwrap(), FindOptions::new())
        .await
        .unwrap();
    assert!(matches!(&connector.statements()[..], [Event::Query { conn: 1, .. }]));
}
