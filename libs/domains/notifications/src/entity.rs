use crate::models::{DeliveryRecord, DeliveryStatus, EventKind, Payload, Priority};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sea-ORM Entity for the delivery_records table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub recipient: String,
    pub recipient_name: Option<String>,
    pub event: EventKind,
    pub status: DeliveryStatus,
    pub priority: Priority,
    pub subject: String,
    pub template_id: String,
    pub render_context: Json, // JSONB field
    pub metadata: Json,       // JSONB field
    pub sender_name: String,
    pub sender_email: String,
    pub message_id: Option<String>,
    pub external_id: Option<String>,
    pub provider: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub next_retry_at: Option<DateTimeWithTimeZone>,
    pub sent_at: Option<DateTimeWithTimeZone>,
    pub delivered_at: Option<DateTimeWithTimeZone>,
    pub read_at: Option<DateTimeWithTimeZone>,
    pub failed_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
    pub error_code: Option<String>,
    pub is_transactional: bool,
    pub is_marketing: bool,
    pub campaign: Option<String>,
    pub segment: Option<String>,
    pub tags: Json, // JSONB array of strings
    pub version: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn json_to_map(value: Json) -> Payload {
    match value {
        Json::Object(map) => map,
        _ => Payload::new(),
    }
}

fn count_from_db(value: i32) -> u32 {
    value.max(0) as u32
}

fn count_to_db(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

// Conversion from Sea-ORM Model to domain DeliveryRecord
impl From<Model> for DeliveryRecord {
    fn from(model: Model) -> Self {
        let tags: Vec<String> = serde_json::from_value(model.tags).unwrap_or_default();

        Self {
            id: model.id,
            recipient: model.recipient,
            recipient_name: model.recipient_name,
            event: model.event,
            status: model.status,
            priority: model.priority,
            subject: model.subject,
            template_id: model.template_id,
            render_context: json_to_map(model.render_context),
            metadata: json_to_map(model.metadata),
            sender_name: model.sender_name,
            sender_email: model.sender_email,
            message_id: model.message_id,
            external_id: model.external_id,
            provider: model.provider,
            retry_count: count_from_db(model.retry_count),
            max_retries: count_from_db(model.max_retries),
            next_retry_at: model.next_retry_at.map(Into::into),
            sent_at: model.sent_at.map(Into::into),
            delivered_at: model.delivered_at.map(Into::into),
            read_at: model.read_at.map(Into::into),
            failed_at: model.failed_at.map(Into::into),
            error_message: model.error_message,
            error_code: model.error_code,
            is_transactional: model.is_transactional,
            is_marketing: model.is_marketing,
            campaign: model.campaign,
            segment: model.segment,
            tags,
            version: model.version,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
            deleted_at: model.deleted_at.map(Into::into),
        }
    }
}

// Conversion from a freshly built DeliveryRecord to Sea-ORM ActiveModel
impl From<DeliveryRecord> for ActiveModel {
    fn from(record: DeliveryRecord) -> Self {
        ActiveModel {
            id: Set(record.id),
            created_at: Set(record.created_at.into()),
            ..mutable_columns(record)
        }
    }
}

/// Every column a status transition may touch. Identity and creation time stay `NotSet`.
pub(crate) fn mutable_columns(record: DeliveryRecord) -> ActiveModel {
    ActiveModel {
        id: NotSet,
        recipient: Set(record.recipient),
        recipient_name: Set(record.recipient_name),
        event: Set(record.event),
        status: Set(record.status),
        priority: Set(record.priority),
        subject: Set(record.subject),
        template_id: Set(record.template_id),
        render_context: Set(Json::Object(record.render_context)),
        metadata: Set(Json::Object(record.metadata)),
        sender_name: Set(record.sender_name),
        sender_email: Set(record.sender_email),
        message_id: Set(record.message_id),
        external_id: Set(record.external_id),
        provider: Set(record.provider),
        retry_count: Set(count_to_db(record.retry_count)),
        max_retries: Set(count_to_db(record.max_retries)),
        next_retry_at: Set(record.next_retry_at.map(Into::into)),
        sent_at: Set(record.sent_at.map(Into::into)),
        delivered_at: Set(record.delivered_at.map(Into::into)),
        read_at: Set(record.read_at.map(Into::into)),
        failed_at: Set(record.failed_at.map(Into::into)),
        error_message: Set(record.error_message),
        error_code: Set(record.error_code),
        is_transactional: Set(record.is_transactional),
        is_marketing: Set(record.is_marketing),
        campaign: Set(record.campaign),
        segment: Set(record.segment),
        tags: Set(Json::from(record.tags)),
        version: Set(record.version),
        created_at: NotSet,
        updated_at: Set(record.updated_at.into()),
        deleted_at: Set(record.deleted_at.map(Into::into)),
    }
}
