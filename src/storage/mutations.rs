//! Write operations for AttributionStore
//!
//! `upsert_lead` 采用 "insert, on conflict do nothing, then select" 的原子
//! 条件插入：并发重复投递同一令牌时只有一次插入生效，其余观察到既有行。

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr};
use tracing::{debug, info};

use super::models::{NewClick, NewLead};
use super::{AttributionStore, retry};
use crate::errors::{LinkhubError, Result};
use crate::structs::Destination;

use migration::entities::{choice, click, lead};

/// 判断是否为唯一约束冲突（令牌碰撞 / 重复 Lead）
fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl AttributionStore {
    /// Persist a new Click. A token collision surfaces as `Conflict` so the
    /// caller can regenerate; anything else is a storage failure.
    pub async fn create_click(&self, new: NewClick) -> Result<click::Model> {
        let db = &self.db;

        let result = retry::with_retry(
            &format!("create_click({})", new.ref_token),
            self.retry_config,
            || {
                let active = click::ActiveModel {
                    ref_token: Set(new.ref_token.clone()),
                    src: Set(new.src.clone()),
                    platform_click_id: Set(new.platform_click_id.clone()),
                    utm_source: Set(new.utm_source.clone()),
                    utm_campaign: Set(new.utm_campaign.clone()),
                    utm_adset: Set(new.utm_adset.clone()),
                    utm_ad: Set(new.utm_ad.clone()),
                    user_agent: Set(new.user_agent.clone()),
                    ip: Set(new.ip.clone()),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                };
                async move { active.insert(db).await }
            },
        )
        .await;

        match result {
            Ok(model) => {
                debug!("Click recorded: token={} src={}", model.ref_token, model.src);
                Ok(model)
            }
            Err(e) if is_unique_violation(&e) => Err(LinkhubError::conflict(format!(
                "令牌冲突: {}",
                new.ref_token
            ))),
            Err(e) => Err(LinkhubError::database_operation(format!(
                "创建 Click 失败: {}",
                e
            ))),
        }
    }

    /// Persist the destination choice for a Click.
    pub async fn create_choice(&self, click_id: i64, dest: Destination) -> Result<choice::Model> {
        let db = &self.db;

        let model = retry::with_retry(
            &format!("create_choice({}, {})", click_id, dest),
            self.retry_config,
            || {
                let active = choice::ActiveModel {
                    click_id: Set(click_id),
                    dest: Set(dest.as_ref().to_string()),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                };
                async move { active.insert(db).await }
            },
        )
        .await
        .map_err(|e| LinkhubError::database_operation(format!("创建 Choice 失败: {}", e)))?;

        Ok(model)
    }

    /// Idempotent Lead upsert keyed on token and click back-reference.
    ///
    /// Returns the Lead row plus a flag telling whether this call performed
    /// the insert. On conflict the pre-existing row is returned unchanged,
    /// first_event_at included.
    pub async fn upsert_lead(&self, new: NewLead) -> Result<(lead::Model, bool)> {
        let db = &self.db;

        let active = lead::ActiveModel {
            click_id: Set(new.click_id),
            ref_token: Set(Some(new.ref_token.clone())),
            channel: Set(new.channel.clone()),
            external_user_id: Set(new.external_user_id.clone()),
            first_event_at: Set(Utc::now()),
            status: Set("new".to_string()),
            raw: Set(new.raw.clone()),
            ..Default::default()
        };

        let insert_result = lead::Entity::insert(active)
            .on_conflict(
                OnConflict::column(lead::Column::RefToken)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(db)
            .await;

        let inserted = match insert_result {
            Ok(_) => true,
            // ON CONFLICT DO NOTHING 命中：既有行胜出
            Err(DbErr::RecordNotInserted) => false,
            // click_id 上的唯一约束不在 ON CONFLICT 目标内，单独吸收
            Err(e) if is_unique_violation(&e) => false,
            Err(e) => {
                return Err(LinkhubError::database_operation(format!(
                    "Upsert Lead '{}' 失败: {}",
                    new.ref_token, e
                )));
            }
        };

        let existing = self.reselect_lead(&new).await?;
        match existing {
            Some(model) => {
                if inserted {
                    info!(
                        "Lead created: token={} channel={}",
                        new.ref_token, new.channel
                    );
                }
                Ok((model, inserted))
            }
            // 插入与重查之间被删除：按存储异常处理
            None => Err(LinkhubError::database_operation(format!(
                "Lead '{}' 在 upsert 后不可见",
                new.ref_token
            ))),
        }
    }

    /// Re-read the winning Lead row after the conditional insert, by token
    /// first and by click back-reference as the fallback.
    async fn reselect_lead(&self, new: &NewLead) -> Result<Option<lead::Model>> {
        let db = &self.db;
        let token = new.ref_token.clone();

        let by_token = retry::with_retry(
            &format!("reselect_lead({})", token),
            self.retry_config,
            || {
                let token = token.clone();
                async move {
                    lead::Entity::find()
                        .filter(lead::Column::RefToken.eq(token))
                        .one(db)
                        .await
                }
            },
        )
        .await
        .map_err(|e| LinkhubError::database_operation(format!("查询 Lead 失败: {}", e)))?;

        if by_token.is_some() {
            return Ok(by_token);
        }

        // 同一 Click 可能已被另一令牌的 Lead 占用
        if let Some(click_id) = new.click_id {
            let by_click = lead::Entity::find()
                .filter(lead::Column::ClickId.eq(click_id))
                .one(db)
                .await
                .map_err(|e| {
                    LinkhubError::database_operation(format!("查询 Lead 失败: {}", e))
                })?;
            return Ok(by_click);
        }

        Ok(None)
    }
}
