//! Concurrent checkouts never sell more than is in stock.

mod common;

use std::sync::Arc;

use common::*;
use futures::future::join_all;
use marketplace_orders::prelude::*;

const STOCK: i64 = 5;
const BUYERS: usize = 12;

async fn limited_drop() -> MemoryStore {
    let store = marketplace().await;
    store
        .put_product(Product::new("print", "v-loom", "Signed Print", inr(2500.0), STOCK))
        .await;
    store
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exactly_stock_many_commits_succeed() {
    let store = limited_drop().await;
    let engine = Arc::new(engine(store.clone()));

    // Everyone prices the cart while stock is still there...
    let mut prepared = Vec::new();
    for i in 0..BUYERS {
        let buyer = format!("c-{i}");
        prepared.push(
            engine
                .prepare(request(&buyer, vec![CartLine::new("print", 1)]))
                .await
                .unwrap(),
        );
    }

    // ...then all commits race.
    let handles: Vec<_> = prepared
        .into_iter()
        .map(|p| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.commit(p).await })
        })
        .collect();

    let mut committed = 0;
    let mut conflicts = 0;
    for result in join_all(handles).await {
        match result.unwrap() {
            Ok(_) => committed += 1,
            Err(err @ OrderError::StockConflict { .. }) => {
                assert!(err.is_retryable());
                assert_eq!(err.status_code(), http::StatusCode::CONFLICT);
                conflicts += 1;
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(committed, STOCK as usize);
    assert_eq!(conflicts, BUYERS - STOCK as usize);

    let print = stock(&store, "print").await;
    assert_eq!(print.stock_quantity, 0);
    assert_eq!(print.stock_status, StockStatus::OutOfStock);
    assert_eq!(store.order_count().await, STOCK as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_never_go_negative() {
    let store = limited_drop().await;
    let engine = Arc::new(engine(store.clone()));

    let handles: Vec<_> = (0..BUYERS)
        .map(|i| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .submit_checkout(request(&format!("c-{i}"), vec![CartLine::new("print", 2)]))
                    .await
            })
        })
        .collect();

    let mut units_sold = 0;
    for result in join_all(handles).await {
        match result.unwrap() {
            Ok(_) => units_sold += 2,
            // Losers fail either at pricing time or inside the commit.
            Err(OrderError::StockConflict { .. })
            | Err(OrderError::InsufficientStock { .. })
            | Err(OrderError::OutOfStock { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    let print = stock(&store, "print").await;
    assert!(print.stock_quantity >= 0);
    assert_eq!(units_sold, STOCK - print.stock_quantity);
    assert_eq!(units_sold, 4);
}

#[tokio::test]
async fn failed_line_rolls_back_earlier_lines() {
    let store = limited_drop().await;
    let engine = engine(store.clone());

    let cart = vec![CartLine::new("scarf", 3), CartLine::new("print", 5)];
    let prepared = engine.prepare(request("c-1", cart)).await.unwrap();

    // Someone else buys a print between pricing and commit.
    engine
        .submit_checkout(request("c-2", vec![CartLine::new("print", 1)]))
        .await
        .unwrap();

    let err = engine.commit(prepared).await.unwrap_err();
    assert!(matches!(err, OrderError::StockConflict { ref product_id } if product_id.as_str() == "print"));

    assert_eq!(stock(&store, "scarf").await.stock_quantity, 10);
    assert_eq!(stock(&store, "print").await.stock_quantity, STOCK - 1);
    assert_eq!(store.order_count().await, 1);
}

#[tokio::test]
async fn product_delisted_before_commit_is_a_conflict() {
    let store = limited_drop().await;
    let engine = engine(store.clone());

    let cart = vec![CartLine::new("scarf", 2), CartLine::new("print", 1)];
    let prepared = engine.prepare(request("c-1", cart)).await.unwrap();
    assert!(store.remove_product(&ProductId::new("print")).await.is_some());

    let err = engine.commit(prepared).await.unwrap_err();
    assert!(matches!(err, OrderError::StockConflict { ref product_id } if product_id.as_str() == "print"));
    assert!(err.is_retryable());
    assert_eq!(err.status_code(), http::StatusCode::CONFLICT);

    assert_eq!(store.order_count().await, 0);
    assert_eq!(stock(&store, "scarf").await.stock_quantity, 10);
}

#[tokio::test]
async fn commit_is_bounded_by_timeout() {
    let store = limited_drop().await;
    let mut config = EngineConfig::default();
    config.commit_timeout_ms = 50;
    let engine = CheckoutEngine::new(store.clone(), config);

    let prepared = engine
        .prepare(request("c-1", vec![CartLine::new("print", 1)]))
        .await
        .unwrap();

    // Hold the store's transaction lock so the commit cannot start.
    let blocker = store.begin().await.unwrap();
    let err = engine.commit(prepared).await.unwrap_err();
    assert!(matches!(err, OrderError::CommitTimeout(50)));
    assert!(err.is_retryable());
    drop(blocker);

    assert_eq!(store.order_count().await, 0);
    assert_eq!(stock(&store, "print").await.stock_quantity, STOCK);
}
