use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeliveryRecords::Table)
                    .if_not_exists()
                    .col(pk_uuid(DeliveryRecords::Id))
                    .col(
                        ColumnDef::new(DeliveryRecords::Recipient)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(string_len_null(DeliveryRecords::RecipientName, 255))
                    .col(
                        ColumnDef::new(DeliveryRecords::Event)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryRecords::Status)
                            .string_len(32)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(DeliveryRecords::Priority)
                            .string_len(16)
                            .not_null()
                            .default("normal"),
                    )
                    .col(
                        ColumnDef::new(DeliveryRecords::Subject)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryRecords::TemplateId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryRecords::RenderContext)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'{}'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(DeliveryRecords::Metadata)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'{}'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(DeliveryRecords::SenderName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryRecords::SenderEmail)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(string_len_null(DeliveryRecords::MessageId, 255))
                    .col(string_len_null(DeliveryRecords::ExternalId, 255))
                    .col(string_len_null(DeliveryRecords::Provider, 64))
                    .col(
                        ColumnDef::new(DeliveryRecords::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DeliveryRecords::MaxRetries)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(timestamp_with_time_zone_null(DeliveryRecords::NextRetryAt))
                    .col(timestamp_with_time_zone_null(DeliveryRecords::SentAt))
                    .col(timestamp_with_time_zone_null(DeliveryRecords::DeliveredAt))
                    .col(timestamp_with_time_zone_null(DeliveryRecords::ReadAt))
                    .col(timestamp_with_time_zone_null(DeliveryRecords::FailedAt))
                    .col(text_null(DeliveryRecords::ErrorMessage))
                    .col(string_len_null(DeliveryRecords::ErrorCode, 64))
                    .col(
                        ColumnDef::new(DeliveryRecords::IsTransactional)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(DeliveryRecords::IsMarketing)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(string_len_null(DeliveryRecords::Campaign, 128))
                    .col(string_len_null(DeliveryRecords::Segment, 128))
                    .col(
                        ColumnDef::new(DeliveryRecords::Tags)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(DeliveryRecords::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        timestamp_with_time_zone(DeliveryRecords::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(DeliveryRecords::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(DeliveryRecords::DeletedAt))
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_delivery_records_recipient", DeliveryRecords::Recipient),
            ("idx_delivery_records_event", DeliveryRecords::Event),
            ("idx_delivery_records_status", DeliveryRecords::Status),
            ("idx_delivery_records_message_id", DeliveryRecords::MessageId),
            ("idx_delivery_records_created_at", DeliveryRecords::CreatedAt),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(DeliveryRecords::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        // Retry sweep: failed records ordered by failure time
        manager
            .create_index(
                Index::create()
                    .name("idx_delivery_records_retry")
                    .table(DeliveryRecords::Table)
                    .col(DeliveryRecords::Status)
                    .col(DeliveryRecords::NextRetryAt)
                    .col(DeliveryRecords::FailedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeliveryRecords::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum DeliveryRecords {
    Table,
    Id,
    Recipient,
    RecipientName,
    Event,
    Status,
    Priority,
    Subject,
    TemplateId,
    RenderContext,
    Metadata,
    SenderName,
    SenderEmail,
    MessageId,
    ExternalId,
    Provider,
    RetryCount,
    MaxRetries,
    NextRetryAt,
    SentAt,
    DeliveredAt,
    ReadAt,
    FailedAt,
    ErrorMessage,
    ErrorCode,
    IsTransactional,
    IsMarketing,
    Campaign,
    Segment,
    Tags,
    Version,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
