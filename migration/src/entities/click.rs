//! Click entity: one row per routing-decision request

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "clicks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// 追踪令牌（16 位 hex，全局唯一，创建后不可变）
    #[sea_orm(unique)]
    pub ref_token: String,
    /// Traffic source label (e.g. "tiktok", "organic")
    pub src: String,
    /// Ad-platform click id (e.g. ttclid), if the landing URL carried one
    pub platform_click_id: Option<String>,
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_adset: Option<String>,
    pub utm_ad: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::choice::Entity")]
    Choice,
    #[sea_orm(has_one = "super::lead::Entity")]
    Lead,
}

impl Related<super::choice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Choice.def()
    }
}

impl Related<super::lead::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lead.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
