use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// 同意レコードはユーザー削除後も残すため users への外部キーを張らない
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserConsents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserConsents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserConsents::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(UserConsents::ConsentType)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserConsents::IsGranted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(UserConsents::GrantedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(UserConsents::RevokedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(UserConsents::IpAddress).string_len(45))
                    .col(ColumnDef::new(UserConsents::UserAgent).text())
                    .col(
                        ColumnDef::new(UserConsents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserConsents::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 最新レコードの検索用
        manager
            .create_index(
                Index::create()
                    .name("idx_user_consents_user_type_created")
                    .table(UserConsents::Table)
                    .col(UserConsents::UserId)
                    .col(UserConsents::ConsentType)
                    .col(UserConsents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserConsents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserConsents {
    Table,
    Id,
    UserId,
    ConsentType,
    IsGranted,
    GrantedAt,
    RevokedAt,
    IpAddress,
    UserAgent,
    CreatedAt,
    UpdatedAt,
}
