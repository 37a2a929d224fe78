//! Lead entity: an external channel user correlated back to a Click
//!
//! 唯一约束同时落在 click_id 和 ref_token 上，upsert 的幂等性以此为准。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Back-reference to the Click; NULL for leads that could not be attributed
    #[sea_orm(unique)]
    pub click_id: Option<i64>,
    /// Token mirror used as the alternate lookup key
    #[sea_orm(unique)]
    pub ref_token: Option<String>,
    /// "chat" or "messaging"
    pub channel: String,
    /// Platform-specific user id (chat-platform sender id / messaging userId)
    pub external_user_id: Option<String>,
    pub first_event_at: DateTimeUtc,
    pub status: String,
    /// Raw inbound event snapshot, kept for diagnostics only
    #[sea_orm(column_type = "Text", nullable)]
    pub raw: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::click::Entity",
        from = "Column::ClickId",
        to = "super::click::Column::Id"
    )]
    Click,
}

impl Related<super::click::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Click.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
