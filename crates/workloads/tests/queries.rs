//! Query execution against a scripted database.

mod common;

use common::ScriptedDb;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use workload_core::{Workload, INIT_QUERY_NAME};
use workloads::{ecommerce, knowledge_base, Ecommerce, KnowledgeBase};

#[tokio::test]
async fn test_ecommerce_mix_runs_every_query() {
    let db = ScriptedDb::default();
    let workload = Ecommerce::new();

    let mut seen: HashMap<String, u64> = HashMap::new();
    for _ in 0..2000 {
        let result = workload.execute_query(&db).await;
        assert!(result.is_ok(), "{} failed: {:?}", result.query_name, result.error);
        assert!(result.rows_affected > 0);
        *seen.entry(result.query_name).or_default() += 1;
    }

    for query in ecommerce::QUERIES {
        assert!(seen.contains_key(query.name), "{} never ran", query.name);
    }
    // 40% expected; generous bounds for 2000 draws
    let similar = seen["similar_products"] as f64 / 2000.0;
    assert!((0.34..0.46).contains(&similar), "similar_products share {similar}");

    // Bounds are counted once, then cached
    assert_eq!(db.queries_containing("COUNT(*) FROM \"products\""), 1);
    assert_eq!(db.queries_containing("vector_dims(embedding)"), 1);
}

#[tokio::test]
async fn test_checkout_is_a_single_statement() {
    let db = ScriptedDb::default();
    let workload = Ecommerce::new();

    let mut checkouts = 0;
    for _ in 0..1000 {
        let result = workload.execute_query(&db).await;
        assert!(result.is_ok(), "{} failed: {:?}", result.query_name, result.error);
        if result.query_name == "checkout" {
            checkouts += 1;
        }
    }
    assert!(checkouts > 0);

    // Cart removal, order and items travel together in one statement
    assert_eq!(db.queries_containing("DELETE FROM cart_items"), checkouts);
    let statements = db.queries.lock().unwrap().clone();
    for sql in statements.iter().filter(|sql| sql.contains("DELETE FROM cart_items")) {
        assert!(sql.contains("RETURNING product_id, quantity"));
        assert!(sql.contains("INSERT INTO orders"));
        assert!(sql.contains("INSERT INTO order_items"));
    }
    assert!(db.statements().iter().all(|sql| {
        !sql.contains("orders") && !sql.contains("order_items") && !sql.contains("DELETE")
    }));
}

#[tokio::test]
async fn test_vector_queries_bind_embeddings() {
    let db = ScriptedDb::default();
    let workload = KnowledgeBase::new();
    for _ in 0..300 {
        assert!(workload.execute_query(&db).await.is_ok());
    }

    assert!(db.queries_containing("ORDER BY embedding <=> $1::text::vector") > 0);
    let updates: Vec<_> = db
        .executed
        .lock()
        .unwrap()
        .iter()
        .filter(|(sql, _)| sql.starts_with("UPDATE articles"))
        .cloned()
        .collect();
    assert!(!updates.is_empty());
    for (sql, params) in updates {
        assert!(sql.contains("embedding = $2::text::vector"));
        match &params[1] {
            workload_core::SqlValue::Vector(v) => assert_eq!(v.len(), 8),
            other => panic!("expected embedding, got {other:?}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_initializes_once() {
    let db = Arc::new(ScriptedDb::default());
    let workload = Arc::new(KnowledgeBase::new());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let db = db.clone();
            let workload = workload.clone();
            tokio::spawn(async move { workload.execute_query(db.as_ref()).await })
        })
        .collect();
    for handle in handles {
        let result = handle.await.unwrap();
        assert!(result.is_ok(), "{:?}", result.error);
        assert!(knowledge_base::QUERIES
            .iter()
            .any(|q| q.name == result.query_name));
    }

    assert_eq!(db.queries_containing("COUNT(*) FROM \"articles\""), 1);
}

#[tokio::test]
async fn test_failed_initialization_is_reported_and_retried() {
    let db = ScriptedDb::default();
    db.fail_queries.store(true, Ordering::SeqCst);
    let workload = Ecommerce::new();

    let failed = workload.execute_query(&db).await;
    assert_eq!(failed.query_name, INIT_QUERY_NAME);
    assert!(failed
        .error
        .as_deref()
        .unwrap()
        .contains("failed to initialize query bounds"));

    db.fail_queries.store(false, Ordering::SeqCst);
    let result = workload.execute_query(&db).await;
    assert!(result.is_ok(), "{:?}", result.error);
    assert_ne!(result.query_name, INIT_QUERY_NAME);
}

#[tokio::test]
async fn test_statement_failure_is_captured() {
    // Bounds come from `query`; every write fails on its first `exec`
    let db = ScriptedDb::failing_at(1);
    let workload = Ecommerce::new();

    let mut failures = 0;
    for _ in 0..500 {
        let result = workload.execute_query(&db).await;
        if let Some(error) = &result.error {
            assert!(error.contains("relation does not exist"));
            assert_eq!(result.rows_affected, 0);
            failures += 1;
        }
    }
    assert_eq!(failures, 1, "only the first exec call fails");
}
