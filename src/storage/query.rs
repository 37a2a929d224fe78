//! Read-only operations for AttributionStore

use std::collections::HashMap;

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, ExprTrait, PaginatorTrait, QueryFilter, QuerySelect};
use tracing::error;

use super::{AttributionStore, retry};
use crate::errors::{LinkhubError, Result};

use migration::entities::{click, lead};

impl AttributionStore {
    /// Look up a Click by its tracking token. No side effects.
    pub async fn find_click_by_token(&self, token: &str) -> Option<click::Model> {
        let db = &self.db;
        let token_owned = token.to_string();

        let result = retry::with_retry(
            &format!("find_click_by_token({})", token),
            self.retry_config,
            || {
                let token = token_owned.clone();
                async move {
                    click::Entity::find()
                        .filter(click::Column::RefToken.eq(token))
                        .one(db)
                        .await
                }
            },
        )
        .await;

        match result {
            Ok(model) => model,
            Err(e) => {
                error!("查询 Click 失败（重试后仍失败）: {}", e);
                None
            }
        }
    }

    /// Look up a Lead by token (the alternate unique key).
    pub async fn find_lead_by_token(&self, token: &str) -> Option<lead::Model> {
        let db = &self.db;
        let token_owned = token.to_string();

        let result = retry::with_retry(
            &format!("find_lead_by_token({})", token),
            self.retry_config,
            || {
                let token = token_owned.clone();
                async move {
                    lead::Entity::find()
                        .filter(lead::Column::RefToken.eq(token))
                        .one(db)
                        .await
                }
            },
        )
        .await;

        match result {
            Ok(model) => model,
            Err(e) => {
                error!("查询 Lead 失败（重试后仍失败）: {}", e);
                None
            }
        }
    }

    pub async fn count_clicks(&self) -> Result<u64> {
        click::Entity::find()
            .count(&self.db)
            .await
            .map_err(|e| LinkhubError::database_operation(format!("统计 Click 失败: {}", e)))
    }

    pub async fn count_leads(&self) -> Result<u64> {
        lead::Entity::find()
            .count(&self.db)
            .await
            .map_err(|e| LinkhubError::database_operation(format!("统计 Lead 失败: {}", e)))
    }

    /// Click counts grouped by utm_campaign; clicks without a campaign are
    /// bucketed under "NA".
    pub async fn clicks_by_campaign(&self) -> Result<HashMap<String, i64>> {
        let rows: Vec<(Option<String>, i64)> = click::Entity::find()
            .select_only()
            .column(click::Column::UtmCampaign)
            .column_as(Expr::col(click::Column::Id).count(), "count")
            .group_by(click::Column::UtmCampaign)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| {
                LinkhubError::database_operation(format!("按 campaign 聚合失败: {}", e))
            })?;

        Ok(rows
            .into_iter()
            .map(|(campaign, count)| (campaign.unwrap_or_else(|| "NA".to_string()), count))
            .collect())
    }
}
