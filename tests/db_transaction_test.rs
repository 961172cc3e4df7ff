use anyhow::Result;
use serde_json::Value;
use tax_parsers::{batch_insert, Db, ParserError, Record};

async fn test_db() -> Result<Db> {
    let mut db = Db::connect("sqlite::memory:").await?;
    db.execute("CREATE TABLE rows (id TEXT, amount REAL)").await?;
    Ok(db)
}

async fn count_rows(db: &mut Db) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rows")
        .fetch_one(db.conn())
        .await?;
    Ok(count)
}

fn row(id: &str, amount: f64) -> Record {
    let mut record = Record::new();
    record.insert("id", id);
    record.insert("amount", amount);
    record
}

#[tokio::test]
async fn test_successful_transaction_commits() -> Result<()> {
    let mut db = test_db().await?;
    db.transaction(|db| {
        Box::pin(async move { batch_insert(db, "rows", &[row("a", 1.0)]).await })
    })
    .await?;
    assert_eq!(count_rows(&mut db).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_nested_transactions_commit_exactly_once() -> Result<()> {
    let mut db = test_db().await?;

    // A second BEGIN inside the outer scope would fail outright; the depth
    // counter makes the inner scope a pass-through.
    db.transaction(|db| {
        Box::pin(async move {
            batch_insert(db, "rows", &[row("outer", 1.0)]).await?;
            db.transaction(|db| {
                Box::pin(async move { batch_insert(db, "rows", &[row("inner", 2.0)]).await })
            })
            .await
        })
    })
    .await?;

    assert_eq!(count_rows(&mut db).await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_failure_rolls_back_and_wraps_once() -> Result<()> {
    let mut db = test_db().await?;

    let err = db
        .transaction(|db| {
            Box::pin(async move {
                batch_insert(db, "rows", &[row("doomed", 1.0)]).await?;
                Err::<(), _>(ParserError::validation("forced failure"))
            })
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ParserError::Database { .. }));
    let message = err.to_string();
    assert_eq!(message.matches("Transaction failed").count(), 1);
    assert_eq!(count_rows(&mut db).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_inner_failure_rolls_back_whole_chain() -> Result<()> {
    let mut db = test_db().await?;

    let err = db
        .transaction(|db| {
            Box::pin(async move {
                batch_insert(db, "rows", &[row("outer", 1.0)]).await?;
                db.transaction(|db| {
                    Box::pin(async move {
                        batch_insert(db, "rows", &[row("inner", 2.0)]).await?;
                        Err::<(), _>(ParserError::validation("inner failure"))
                    })
                })
                .await
            })
        })
        .await
        .unwrap_err();

    // Wrapped exactly once even though two scopes saw the failure.
    assert_eq!(err.to_string().matches("Transaction failed").count(), 1);
    assert_eq!(count_rows(&mut db).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_connection_usable_after_rollback() -> Result<()> {
    let mut db = test_db().await?;

    let _ = db
        .transaction(|db| {
            Box::pin(async move {
                batch_insert(db, "rows", &[row("doomed", 1.0)]).await?;
                Err::<(), _>(ParserError::validation("forced failure"))
            })
        })
        .await;

    db.transaction(|db| {
        Box::pin(async move { batch_insert(db, "rows", &[row("kept", 2.0)]).await })
    })
    .await?;

    assert_eq!(count_rows(&mut db).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_batch_insert_multiple_rows_and_missing_columns() -> Result<()> {
    let mut db = test_db().await?;

    let mut sparse = Record::new();
    sparse.insert("id", "sparse");
    // No amount field; binds NULL.

    db.transaction(|db| {
        Box::pin(async move {
            batch_insert(db, "rows", &[row("a", 1.5), row("b", 2.5), sparse]).await
        })
    })
    .await?;

    assert_eq!(count_rows(&mut db).await?, 3);
    let amount: Option<f64> =
        sqlx::query_scalar("SELECT amount FROM rows WHERE id = 'sparse'")
            .fetch_one(db.conn())
            .await?;
    assert_eq!(amount, None);
    Ok(())
}

#[tokio::test]
async fn test_batch_insert_empty_slice_is_noop() -> Result<()> {
    let mut db = test_db().await?;
    batch_insert(&mut db, "rows", &[]).await?;
    assert_eq!(count_rows(&mut db).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_batch_insert_rejects_hostile_identifiers() -> Result<()> {
    let mut db = test_db().await?;

    let err = batch_insert(&mut db, "rows; DROP TABLE rows", &[row("a", 1.0)])
        .await
        .unwrap_err();
    assert!(matches!(err, ParserError::Database { .. }));

    let mut bad_column = Record::new();
    bad_column.insert("id\" TEXT); --", Value::from("x"));
    let err = batch_insert(&mut db, "rows", &[bad_column]).await.unwrap_err();
    assert!(matches!(err, ParserError::Database { .. }));
    Ok(())
}
