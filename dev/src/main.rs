use std::env;

use log::info;
use tablesmith::{ColumnDefinition, ColumnType, Database, RowValues, TableAlteration, TableDefinition};

async fn connect() -> Result<Database, Box<dyn std::error::Error>> {
    let url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
    let max_connections: u32 = match env::var("MAX_CONNECTIONS") {
        Ok(raw) => raw.parse()?,
        Err(_) => 1,
    };

    let db = Database::builder().max_connections(max_connections).connect(&url).await?;
    info!("connected to {:?} ({})", db.driver(), url);
    Ok(db)
}

fn values(json: serde_json::Value) -> Result<RowValues, Box<dyn std::error::Error>> {
    match json {
        serde_json::Value::Object(map) => Ok(tablesmith::row_values_from_json(map)?),
        other => Err(format!("expected a JSON object, got {}", other).into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let db = connect().await?;
    let engine = db.engine();

    let widgets: TableDefinition = serde_json::from_value(serde_json::json!({
        "name": "Widgets",
        "columns": [{ "name": "Label", "type": "String", "maxLength": 50, "allowNull": false }]
    }))?;
    engine.create_table(&widgets).await?;
    println!("Columns: {}", serde_json::to_string_pretty(&engine.list_columns("Widgets").await?)?);

    engine.insert("Widgets", &values(serde_json::json!({ "Label": "foo" }))?).await?;
    println!("After insert: {}", serde_json::to_string(&engine.get_all("Widgets").await?)?);

    engine.update_by_id("Widgets", 1, &values(serde_json::json!({ "Label": "bar" }))?).await?;
    println!("After update: {}", serde_json::to_string(&engine.get_all("Widgets").await?)?);

    engine
        .alter_table(&TableAlteration::new("Widgets").add_column(ColumnDefinition::new("Size", ColumnType::Int)))
        .await?;
    engine.insert("Widgets", &values(serde_json::json!({ "Label": "baz", "Size": 7 }))?).await?;
    let sized = engine.get_filtered("Widgets", &values(serde_json::json!({ "Size": 7 }))?).await?;
    println!("Size = 7: {}", serde_json::to_string(&sized)?);
    println!("Labels: {}", serde_json::to_string(&engine.get_columns("Widgets", &["Label"]).await?)?);

    engine.delete_by_id("Widgets", 1).await?;
    engine.delete_by_id("Widgets", 2).await?;
    println!("After delete: {}", serde_json::to_string(&engine.get_all("Widgets").await?)?);

    engine.drop_table("Widgets").await?;
    println!("Tables: {:?}", engine.list_tables().await?);

    db.close().await;
    Ok(())
}
