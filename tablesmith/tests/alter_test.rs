use sqlx::any::AnyArguments;
use tablesmith::{
    AlterMode, ColumnDefinition, ColumnType, Connection, Database, Error, RowValues, TableAlteration, TableDefinition,
    Value,
};

async fn setup() -> Result<Database, Box<dyn std::error::Error>> {
    let db = Database::builder().max_connections(1).connect("sqlite::memory:").await?;
    db.engine()
        .create_table(
            &TableDefinition::new("Parts")
                .column(ColumnDefinition::new("Code", ColumnType::String).max_length(20))
                .column(ColumnDefinition::new("Weight", ColumnType::Double)),
        )
        .await?;
    Ok(db)
}

fn column_names(columns: &[tablesmith::ColumnMetadata]) -> Vec<&str> {
    columns.iter().map(|c| c.name.as_str()).collect()
}

#[tokio::test]
async fn test_alter_adds_and_drops_columns() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    let engine = db.engine();

    let mut values = RowValues::new();
    values.insert("Code".to_string(), "A-1".into());
    engine.insert("Parts", &values).await?;

    let alteration = TableAlteration::new("Parts")
        .add_column(ColumnDefinition::new("Color", ColumnType::String).max_length(20))
        .add_column(ColumnDefinition::new("Count", ColumnType::Int).not_null())
        .drop_column("weight");
    engine.alter_table(&alteration).await?;

    let columns = engine.list_columns("Parts").await?;
    assert_eq!(column_names(&columns), ["Id", "Code", "Color", "Count"]);
    assert!(columns[2].is_nullable);
    assert!(!columns[3].is_nullable);

    // existing rows pick up the default of the new NOT NULL column
    let rows = engine.get_all("Parts").await?;
    assert_eq!(rows[0]["Count"], Value::Int(0));
    assert!(rows[0]["Color"].is_null());

    let projected = engine.get_columns("Parts", &["Color", "Count"]).await?;
    assert_eq!(projected[0].len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_alter_validates_against_live_schema() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    let engine = db.engine();

    let err = engine.alter_table(&TableAlteration::new("Parts").drop_column("Id")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = engine.alter_table(&TableAlteration::new("Parts").drop_column("Missing")).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid argument: Invalid columns: Missing");

    let add_code = TableAlteration::new("Parts").add_column(ColumnDefinition::new("code", ColumnType::Int));
    let err = engine.alter_table(&add_code).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = engine.alter_table(&TableAlteration::new("Bins").drop_column("Code")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(ref msg) if msg.contains("does not exist")));

    let add_id = TableAlteration::new("Parts").add_column(ColumnDefinition::new("ID", ColumnType::Int));
    let err = engine.alter_table(&add_id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidIdentifier(_)));

    assert_eq!(column_names(&engine.list_columns("Parts").await?), ["Id", "Code", "Weight"]);
    Ok(())
}

#[tokio::test]
async fn test_empty_alteration_is_noop() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    let engine = db.engine();

    engine.alter_table(&TableAlteration::new("Parts")).await?;
    engine.alter_table(&TableAlteration::new("DoesNotMatter")).await?;
    assert_eq!(engine.list_columns("Parts").await?.len(), 3);
    Ok(())
}

/// An index on `Code` makes SQLite refuse to drop it, so the second
/// statement of the alteration fails after the first one ran.
async fn index_code(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    db.execute("CREATE INDEX \"IX_Parts_Code\" ON \"Parts\" (\"Code\")", AnyArguments::default()).await?;
    Ok(())
}

fn add_then_drop() -> TableAlteration {
    TableAlteration::new("Parts")
        .add_column(ColumnDefinition::new("Color", ColumnType::String))
        .drop_column("Code")
}

#[tokio::test]
async fn test_atomic_alter_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    index_code(&db).await?;
    let engine = db.engine();
    assert_eq!(engine.options().alter_mode, AlterMode::Atomic);

    let err = engine.alter_table(&add_then_drop()).await.unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable(_)));

    let columns = engine.list_columns("Parts").await?;
    assert_eq!(column_names(&columns), ["Id", "Code", "Weight"]);
    Ok(())
}

#[tokio::test]
async fn test_sequential_alter_reports_partial_apply() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    index_code(&db).await?;
    let engine = db.engine().with_alter_mode(AlterMode::Sequential);

    let err = engine.alter_table(&add_then_drop()).await.unwrap_err();
    match err {
        Error::PartialApply { applied, total, .. } => {
            assert_eq!(applied, 1);
            assert_eq!(total, 2);
        }
        other => panic!("expected PartialApply, got {other:?}"),
    }

    let columns = engine.list_columns("Parts").await?;
    assert_eq!(column_names(&columns), ["Id", "Code", "Weight", "Color"]);
    Ok(())
}

#[tokio::test]
async fn test_alteration_from_json() -> Result<(), Box<dyn std::error::Error>> {
    let db = setup().await?;
    let engine = db.engine();

    let request = r#"{"tableName":"Parts","addColumns":[{"name":"Shipped","type":"DateTime"}],"dropColumns":["Weight"]}"#;
    let alteration: TableAlteration = serde_json::from_str(request)?;
    engine.alter_table(&alteration).await?;

    assert_eq!(column_names(&engine.list_columns("Parts").await?), ["Id", "Code", "Shipped"]);
    Ok(())
}
