use futures::future::BoxFuture;
use log::debug;
use sqlx::any::{AnyArguments, AnyQueryResult, AnyRow};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    database::{Connection, Drivers},
    engine::DataEngine,
    statement::Statement,
    Error,
};

/// A wrapper around a SQLx transaction.
///
/// Every engine operation issued through [`Transaction::engine`] joins the
/// transaction. Nothing is persisted until [`Transaction::commit`]; dropping
/// the last handle without committing rolls everything back.
///
/// Clones share the same underlying transaction. Once it is committed or
/// rolled back, every clone fails with a protocol error.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub(crate) tx: Arc<Mutex<Option<sqlx::Transaction<'static, sqlx::Any>>>>,
    pub(crate) driver: Drivers,
}

fn finished() -> sqlx::Error {
    sqlx::Error::Protocol("transaction already finished".to_string())
}

impl Connection for Transaction {
    fn driver(&self) -> Drivers {
        self.driver
    }

    fn execute<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<AnyQueryResult, sqlx::Error>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let tx = guard.as_mut().ok_or_else(finished)?;
            sqlx::query_with(sql, args).execute(&mut **tx).await
        })
    }

    fn fetch_all<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<Vec<AnyRow>, sqlx::Error>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let tx = guard.as_mut().ok_or_else(finished)?;
            sqlx::query_with(sql, args).fetch_all(&mut **tx).await
        })
    }

    fn fetch_one<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<AnyRow, sqlx::Error>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let tx = guard.as_mut().ok_or_else(finished)?;
            sqlx::query_with(sql, args).fetch_one(&mut **tx).await
        })
    }

    /// Already inside a transaction, so the batch simply joins it.
    fn execute_atomic<'a>(&'a self, statements: &'a [Statement]) -> BoxFuture<'a, Result<u64, sqlx::Error>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let tx = guard.as_mut().ok_or_else(finished)?;
            let mut affected = 0;
            for statement in statements {
                debug!("{}", statement);
                affected += sqlx::query_with(statement.sql(), statement.arguments()?).execute(&mut **tx).await?.rows_affected();
            }
            Ok(affected)
        })
    }
}

impl Transaction {
    /// A dynamic data engine whose operations run inside this transaction.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let tx = db.begin().await?;
    /// let engine = tx.engine();
    ///
    /// engine.create_table(&definition).await?;
    /// engine.insert("Widgets", &values).await?;
    ///
    /// tx.commit().await?;
    /// ```
    pub fn engine(&self) -> DataEngine<Transaction> {
        DataEngine::new(self.clone())
    }

    /// Commits the transaction.
    pub async fn commit(self) -> Result<(), Error> {
        let tx = self.tx.lock().await.take().ok_or_else(finished)?;
        tx.commit().await?;
        Ok(())
    }

    /// Rolls back the transaction.
    ///
    /// This also happens when the last handle is dropped without committing.
    pub async fn rollback(self) -> Result<(), Error> {
        let tx = self.tx.lock().await.take().ok_or_else(finished)?;
        tx.rollback().await?;
        Ok(())
    }
}
