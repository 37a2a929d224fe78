//! Choice entity: the destination selected for a Click

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "choices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub click_id: i64,
    /// Destination channel tag (chat-platform / messaging-app / marketplace)
    pub dest: String,
    pub created_at: DateTimeUtc,
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
