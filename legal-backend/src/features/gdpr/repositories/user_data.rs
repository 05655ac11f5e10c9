// legal-backend/src/features/gdpr/repositories/user_data.rs

use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Asterisk, Expr, Query, SimpleExpr};
use sea_orm::{ConnectionTrait, DatabaseTransaction, DbConn, FromQueryResult, TransactionTrait};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::features::gdpr::models::user_data::{DeletionStep, Ownership, Row, UserTable};

/// ユーザー所有データの読み取りと削除トランザクションの開始
#[async_trait]
pub trait UserDataStore: Send + Sync {
    async fn fetch_rows(&self, table: UserTable, user_id: Uuid) -> AppResult<Vec<Row>>;

    async fn count_rows(&self, table: UserTable, user_id: Uuid) -> AppResult<u64>;

    async fn begin_deletion(&self) -> AppResult<Box<dyn DeletionTransaction>>;
}

/// 削除の作業単位。commit せずに drop した場合はロールバックされる
#[async_trait]
pub trait DeletionTransaction: Send {
    async fn delete_rows(&mut self, step: &DeletionStep, user_id: Uuid) -> AppResult<u64>;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// 所有者条件。親テーブル経由の場合はサブクエリになる
fn owner_condition(scope: Ownership, user_id: Uuid) -> SimpleExpr {
    match scope {
        Ownership::Direct { column } => Expr::col(Alias::new(column)).eq(user_id),
        Ownership::ViaParent { column, parent } => {
            let parent_ids = Query::select()
                .column(Alias::new("id"))
                .from(Alias::new(parent.table_name()))
                .and_where(owner_condition(parent.ownership(), user_id))
                .to_owned();
            Expr::col(Alias::new(column)).in_subquery(parent_ids)
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

/// PostgreSQL上のユーザーデータ。テーブル名はカタログから組み立てる
#[derive(Clone)]
pub struct UserDataRepository {
    db: DbConn,
}

impl UserDataRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDataStore for UserDataRepository {
    async fn fetch_rows(&self, table: UserTable, user_id: Uuid) -> AppResult<Vec<Row>> {
        let query = Query::select()
            .column(Asterisk)
            .from(Alias::new(table.table_name()))
            .and_where(owner_condition(table.ownership(), user_id))
            .to_owned();
        let statement = self.db.get_database_backend().build(&query);

        let values = Value::find_by_statement(statement).all(&self.db).await?;
        values
            .into_iter()
            .map(|value| match value {
                Value::Object(row) => Ok(row),
                other => Err(AppError::InternalServerError(format!(
                    "Unexpected row shape in {}: {}",
                    table.table_name(),
                    other
                ))),
            })
            .collect()
    }

    async fn count_rows(&self, table: UserTable, user_id: Uuid) -> AppResult<u64> {
        let query = Query::select()
            .expr_as(Expr::col(Asterisk).count(), Alias::new("count"))
            .from(Alias::new(table.table_name()))
            .and_where(owner_condition(table.ownership(), user_id))
            .to_owned();
        let statement = self.db.get_database_backend().build(&query);

        let row = CountRow::find_by_statement(statement).one(&self.db).await?;
        Ok(row.map_or(0, |r| r.count.max(0) as u64))
    }

    async fn begin_deletion(&self) -> AppResult<Box<dyn DeletionTransaction>> {
        let txn = self.db.begin().await?;
        Ok(Box::new(SeaOrmDeletion { txn }))
    }
}

struct SeaOrmDeletion {
    txn: DatabaseTransaction,
}

#[async_trait]
impl DeletionTransaction for SeaOrmDeletion {
    async fn delete_rows(&mut self, step: &DeletionStep, user_id: Uuid) -> AppResult<u64> {
        let query = Query::delete()
            .from_table(Alias::new(step.table.table_name()))
            .and_where(owner_condition(step.scope, user_id))
            .to_owned();
        let statement = self.txn.get_database_backend().build(&query);

        let result = self.txn.execute(statement).await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.txn.rollback().await?;
        Ok(())
    }
}
