use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 clicks 表
        manager
            .create_table(
                Table::create()
                    .table(Click::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Click::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Click::RefToken).string_len(32).not_null())
                    .col(ColumnDef::new(Click::Src).string_len(32).not_null())
                    .col(ColumnDef::new(Click::PlatformClickId).string_len(128).null())
                    .col(ColumnDef::new(Click::UtmSource).string_len(128).null())
                    .col(ColumnDef::new(Click::UtmCampaign).string_len(256).null())
                    .col(ColumnDef::new(Click::UtmAdset).string_len(256).null())
                    .col(ColumnDef::new(Click::UtmAd).string_len(256).null())
                    .col(ColumnDef::new(Click::UserAgent).text().null())
                    .col(ColumnDef::new(Click::Ip).string_len(64).null())
                    .col(
                        ColumnDef::new(Click::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 令牌查找索引（唯一约束是归属关联的权威保证）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_clicks_ref_token")
                    .table(Click::Table)
                    .col(Click::RefToken)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 创建 choices 表
        manager
            .create_table(
                Table::create()
                    .table(Choice::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Choice::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Choice::ClickId).big_integer().not_null())
                    .col(ColumnDef::new(Choice::Dest).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Choice::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_choices_click_id")
                            .from(Choice::Table, Choice::ClickId)
                            .to(Click::Table, Click::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_choices_click_id")
                    .table(Choice::Table)
                    .col(Choice::ClickId)
                    .to_owned(),
            )
            .await?;

        // 创建 leads 表
        manager
            .create_table(
                Table::create()
                    .table(Lead::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Lead::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Lead::ClickId)
                            .big_integer()
                            .null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Lead::RefToken).string_len(32).null())
                    .col(ColumnDef::new(Lead::Channel).string_len(32).not_null())
                    .col(ColumnDef::new(Lead::ExternalUserId).string_len(128).null())
                    .col(
                        ColumnDef::new(Lead::FirstEventAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Lead::Status)
                            .string_len(32)
                            .not_null()
                            .default("new"),
                    )
                    .col(ColumnDef::new(Lead::Raw).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_leads_click_id")
                            .from(Lead::Table, Lead::ClickId)
                            .to(Click::Table, Click::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_leads_ref_token")
                    .table(Lead::Table)
                    .col(Lead::RefToken)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 按外键依赖逆序删除
        manager
            .drop_table(Table::drop().table(Lead::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Choice::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Click::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Click {
    #[sea_orm(iden = "clicks")]
    Table,
    Id,
    RefToken,
    Src,
    PlatformClickId,
    UtmSource,
    UtmCampaign,
    UtmAdset,
    UtmAd,
    UserAgent,
    Ip,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Choice {
    #[sea_orm(iden = "choices")]
    Table,
    Id,
    ClickId,
    Dest,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Lead {
    #[sea_orm(iden = "leads")]
    Table,
    Id,
    ClickId,
    RefToken,
    Channel,
    ExternalUserId,
    FirstEventAt,
    Status,
    Raw,
}
