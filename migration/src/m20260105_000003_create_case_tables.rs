use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 案件に属するテーブルの共通カラム（id, case_id, 作成・更新日時）
fn case_owned_table(table: DynIden, fk_name: &str) -> TableCreateStatement {
    Table::create()
        .table(table.clone())
        .if_not_exists()
        .col(ColumnDef::new(Common::Id).uuid().not_null().primary_key())
        .col(ColumnDef::new(Common::CaseId).uuid().not_null())
        .col(
            ColumnDef::new(Common::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .extra("DEFAULT CURRENT_TIMESTAMP"),
        )
        .col(
            ColumnDef::new(Common::UpdatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .extra("DEFAULT CURRENT_TIMESTAMP"),
        )
        .foreign_key(
            ForeignKey::create()
                .name(fk_name)
                .from(table, Common::CaseId)
                .to(Cases::Table, Cases::Id)
                .on_delete(ForeignKeyAction::Restrict),
        )
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 案件テーブル（description は暗号化エンベロープ）
        manager
            .create_table(
                Table::create()
                    .table(Cases::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Cases::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Cases::UserId).uuid().not_null())
                    .col(ColumnDef::new(Cases::Title).string().not_null())
                    .col(ColumnDef::new(Cases::Description).text())
                    .col(
                        ColumnDef::new(Cases::Status)
                            .string_len(32)
                            .not_null()
                            .default("open"),
                    )
                    .col(
                        ColumnDef::new(Cases::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP"),
                    )
                    .col(
                        ColumnDef::new(Cases::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cases_user_id")
                            .from(Cases::Table, Cases::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cases_user_id")
                    .table(Cases::Table)
                    .col(Cases::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                case_owned_table(Evidence::Table.into_iden(), "fk_evidence_case_id")
                    .col(ColumnDef::new(Evidence::Title).string().not_null())
                    .col(ColumnDef::new(Evidence::Content).text())
                    .col(ColumnDef::new(Evidence::FileName).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                case_owned_table(LegalIssues::Table.into_iden(), "fk_legal_issues_case_id")
                    .col(ColumnDef::new(LegalIssues::Title).string().not_null())
                    .col(ColumnDef::new(LegalIssues::Description).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                case_owned_table(TimelineEvents::Table.into_iden(), "fk_timeline_events_case_id")
                    .col(ColumnDef::new(TimelineEvents::Title).string().not_null())
                    .col(ColumnDef::new(TimelineEvents::Description).text())
                    .col(ColumnDef::new(TimelineEvents::EventDate).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                case_owned_table(Actions::Table.into_iden(), "fk_actions_case_id")
                    .col(ColumnDef::new(Actions::Title).string().not_null())
                    .col(ColumnDef::new(Actions::Description).text())
                    .col(ColumnDef::new(Actions::DueAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Actions::CompletedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                case_owned_table(CaseFacts::Table.into_iden(), "fk_case_facts_case_id")
                    .col(ColumnDef::new(CaseFacts::FactContent).text().not_null())
                    .col(ColumnDef::new(CaseFacts::Source).string())
                    .to_owned(),
            )
            .await?;

        for (table, name) in [
            (Evidence::Table.into_iden(), "idx_evidence_case_id"),
            (LegalIssues::Table.into_iden(), "idx_legal_issues_case_id"),
            (TimelineEvents::Table.into_iden(), "idx_timeline_events_case_id"),
            (Actions::Table.into_iden(), "idx_actions_case_id"),
            (CaseFacts::Table.into_iden(), "idx_case_facts_case_id"),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(table)
                        .col(Common::CaseId)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 子テーブルから削除する
        for table in [
            CaseFacts::Table.into_iden(),
            Actions::Table.into_iden(),
            TimelineEvents::Table.into_iden(),
            LegalIssues::Table.into_iden(),
            Evidence::Table.into_iden(),
            Cases::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Common {
    Id,
    CaseId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Cases {
    Table,
    Id,
    UserId,
    Title,
    Description,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Evidence {
    Table,
    Title,
    Content,
    FileName,
}

#[derive(DeriveIden)]
enum LegalIssues {
    Table,
    Title,
    Description,
}

#[derive(DeriveIden)]
enum TimelineEvents {
    Table,
    Title,
    Description,
    EventDate,
}

#[derive(DeriveIden)]
enum Actions {
    Table,
    Title,
    Description,
    DueAt,
    CompletedAt,
}

#[derive(DeriveIden)]
enum CaseFacts {
    Table,
    FactContent,
    Source,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
