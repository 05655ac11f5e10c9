// migration/src/lib.rs
pub use sea_orm_migration::prelude::*;

// ユーザー・セッション
mod m20260105_000001_create_users_table;
mod m20260105_000002_create_sessions_table;

// 案件データ
mod m20260105_000003_create_case_tables;
mod m20260105_000004_create_notes_and_user_facts_tables;
mod m20260105_000005_create_chat_tables;

// GDPR・監査（ユーザー削除後も保持する）
mod m20260105_000006_create_user_consents_table;
mod m20260105_000007_create_audit_logs_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260105_000001_create_users_table::Migration),
            Box::new(m20260105_000002_create_sessions_table::Migration),
            Box::new(m20260105_000003_create_case_tables::Migration),
            Box::new(m20260105_000004_create_notes_and_user_facts_tables::Migration),
            Box::new(m20260105_000005_create_chat_tables::Migration),
            Box::new(m20260105_000006_create_user_consents_table::Migration),
            Box::new(m20260105_000007_create_audit_logs_table::Migration),
        ]
    }
}
