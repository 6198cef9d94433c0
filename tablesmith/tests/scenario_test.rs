use tablesmith::{ColumnDefinition, ColumnType, Database, Record, RowValues, TableDefinition, Value};

fn row(pairs: &[(&str, Value)]) -> RowValues {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn record(pairs: &[(&str, Value)]) -> Record {
    row(pairs)
}

#[tokio::test]
async fn test_widgets_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    let engine = db.engine();

    // 1. Create
    let widgets = TableDefinition::new("Widgets")
        .column(ColumnDefinition::new("Label", ColumnType::String).max_length(50).not_null());
    engine.create_table(&widgets).await?;

    let columns = engine.list_columns("Widgets").await?;
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].name, "Id");
    assert!(columns[0].is_identity && columns[0].is_primary_key && !columns[0].is_nullable);
    assert_eq!(columns[1].name, "Label");
    assert!(!columns[1].is_nullable);
    assert_eq!(columns[1].max_length, Some(50));

    // 2. Insert
    let affected = engine.insert("Widgets", &row(&[("Label", "foo".into())])).await?;
    assert_eq!(affected, 1);
    assert_eq!(
        engine.get_all("Widgets").await?,
        vec![record(&[("Id", Value::Int(1)), ("Label", "foo".into())])]
    );

    // 3. Update
    let affected = engine.update_by_id("Widgets", 1, &row(&[("Label", "bar".into())])).await?;
    assert_eq!(affected, 1);
    assert_eq!(
        engine.get_all("Widgets").await?,
        vec![record(&[("Id", Value::Int(1)), ("Label", "bar".into())])]
    );

    // 4. Delete
    engine.delete_by_id("Widgets", 1).await?;
    assert!(engine.get_all("Widgets").await?.is_empty());

    // 5. Drop
    engine.drop_table("Widgets").await?;
    assert!(!engine.list_tables().await?.contains(&"Widgets".to_string()));

    println!("Widgets lifecycle test passed!");
    Ok(())
}

#[tokio::test]
async fn test_insert_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    let engine = db.engine();

    engine
        .create_table(
            &TableDefinition::new("Readings")
                .column(ColumnDefinition::new("Sensor", ColumnType::String))
                .column(ColumnDefinition::new("Count", ColumnType::Int))
                .column(ColumnDefinition::new("Level", ColumnType::Double))
                .column(ColumnDefinition::new("Note", ColumnType::String)),
        )
        .await?;

    let values = row(&[
        ("Sensor", "north-2".into()),
        ("Count", Value::Int(42)),
        ("Level", Value::Double(3.25)),
        ("Note", Value::Null),
    ]);
    engine.insert("Readings", &values).await?;

    let rows = engine.get_all("Readings").await?;
    assert_eq!(rows.len(), 1);
    for (column, value) in &values {
        assert_eq!(&rows[0][column], value, "column {column} did not round-trip");
    }
    assert_eq!(rows[0]["Id"], Value::Int(1));

    Ok(())
}

#[tokio::test]
async fn test_timestamp_and_bool_values() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    let engine = db.engine();

    engine
        .create_table(
            &TableDefinition::new("Events")
                .column(ColumnDefinition::new("At", ColumnType::DateTime))
                .column(ColumnDefinition::new("Done", ColumnType::Bool)),
        )
        .await?;

    let at = chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(12, 30, 0).unwrap();
    engine.insert("Events", &row(&[("At", Value::Timestamp(at)), ("Done", Value::Bool(true))])).await?;

    let rows = engine.get_all("Events").await?;
    // SQLite stores timestamps as text and booleans as integers
    assert!(rows[0]["At"].as_str().is_some_and(|text| text.starts_with("2024-05-01 12:30:00")));
    assert!(matches!(rows[0]["Done"], Value::Bool(true) | Value::Int(1)));

    let done = engine.get_filtered("Events", &row(&[("Done", Value::Bool(true))])).await?;
    assert_eq!(done.len(), 1);

    Ok(())
}
