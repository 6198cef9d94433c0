use tablesmith::{ColumnDefinition, ColumnType, DataEngine, Database, Error, RowValues, TableDefinition, Value};

fn row(pairs: &[(&str, Value)]) -> RowValues {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

async fn setup() -> Result<DataEngine<Database>, Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    let engine = db.engine();
    engine
        .create_table(
            &TableDefinition::new("Tasks")
                .column(ColumnDefinition::new("Title", ColumnType::String).not_null())
                .column(ColumnDefinition::new("Priority", ColumnType::Int)),
        )
        .await?;
    Ok(engine)
}

#[tokio::test]
async fn test_insert_rejects_unknown_columns() -> Result<(), Box<dyn std::error::Error>> {
    let engine = setup().await?;

    let values = row(&[("Title", "write docs".into()), ("Priority", Value::Int(2)), ("Owner", "sam".into())]);
    let err = engine.insert("Tasks", &values).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(ref msg) if msg.contains("Owner")));
    assert!(engine.get_all("Tasks").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_insert_validates_payload() -> Result<(), Box<dyn std::error::Error>> {
    let engine = setup().await?;

    let err = engine.insert("Tasks", &RowValues::new()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = engine.insert("Missing", &row(&[("Title", "x".into())])).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(ref msg) if msg.contains("does not exist")));

    let err = engine.insert("Tasks", &row(&[("Title", "a".into()), ("TITLE", "b".into())])).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    // constraint violations come back from the store untouched
    let err = engine.insert("Tasks", &row(&[("Priority", Value::Int(1))])).await.unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable(_)));

    assert!(engine.get_all("Tasks").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_insert_resolves_column_case() -> Result<(), Box<dyn std::error::Error>> {
    let engine = setup().await?;

    engine.insert("Tasks", &row(&[("title", "lowercase".into()), ("PRIORITY", Value::Int(5))])).await?;

    let rows = engine.get_all("Tasks").await?;
    assert_eq!(rows[0]["Title"], Value::from("lowercase"));
    assert_eq!(rows[0]["Priority"], Value::Int(5));
    Ok(())
}

#[tokio::test]
async fn test_ids_are_generated_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let engine = setup().await?;

    for title in ["a", "b", "c"] {
        engine.insert("Tasks", &row(&[("Title", title.into())])).await?;
    }

    let ids: Vec<Value> = engine.get_all("Tasks").await?.into_iter().map(|r| r["Id"].clone()).collect();
    assert_eq!(ids, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    Ok(())
}

#[tokio::test]
async fn test_update_missing_id_changes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let engine = setup().await?;
    engine.insert("Tasks", &row(&[("Title", "keep".into()), ("Priority", Value::Int(1))])).await?;
    let before = engine.get_all("Tasks").await?;

    let affected = engine.update_by_id("Tasks", 99, &row(&[("Title", "changed".into())])).await?;
    assert_eq!(affected, 0);
    assert_eq!(engine.get_all("Tasks").await?, before);
    Ok(())
}

#[tokio::test]
async fn test_update_sets_null_and_validates() -> Result<(), Box<dyn std::error::Error>> {
    let engine = setup().await?;
    engine.insert("Tasks", &row(&[("Title", "t".into()), ("Priority", Value::Int(3))])).await?;

    engine.update_by_id("Tasks", 1, &row(&[("Priority", Value::Null)])).await?;
    assert!(engine.get_all("Tasks").await?[0]["Priority"].is_null());

    let err = engine.update_by_id("Tasks", 1, &RowValues::new()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = engine.update_by_id("", 1, &row(&[("Title", "x".into())])).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = engine.update_by_id("Tasks", 1, &row(&[("Owner", "x".into())])).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    Ok(())
}

#[tokio::test]
async fn test_delete_by_id() -> Result<(), Box<dyn std::error::Error>> {
    let engine = setup().await?;
    engine.insert("Tasks", &row(&[("Title", "first".into())])).await?;
    engine.insert("Tasks", &row(&[("Title", "second".into())])).await?;

    assert_eq!(engine.delete_by_id("Tasks", 42).await?, 0);
    assert_eq!(engine.delete_by_id("Tasks", 1).await?, 1);

    let rows = engine.get_all("Tasks").await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["Title"], Value::from("second"));

    let err = engine.delete_by_id(" ", 1).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    Ok(())
}

#[tokio::test]
async fn test_drop_table_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let engine = setup().await?;

    engine.drop_table("Tasks").await?;
    engine.drop_table("Tasks").await?;
    engine.drop_table("NeverExisted").await?;
    assert!(!engine.table_exists("Tasks").await?);

    let err = engine.drop_table("").await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    Ok(())
}
