//! Attribution storage backend
//!
//! Durable CRUD + constrained upsert over Click/Choice/Lead using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL. The unique indexes on
//! `clicks.ref_token`, `leads.ref_token` and `leads.click_id` are the
//! authoritative guard for token uniqueness and one-lead-per-click.

mod connection;
mod models;
mod mutations;
mod query;
pub mod retry;

use sea_orm::DatabaseConnection;
use tracing::warn;

use crate::config::DatabaseConfig;
use crate::errors::{LinkhubError, Result};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use models::{NewClick, NewLead};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite://")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(LinkhubError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// SeaORM-based attribution store
#[derive(Clone)]
pub struct AttributionStore {
    db: DatabaseConnection,
    backend_name: String,
    /// 重试配置
    retry_config: retry::RetryConfig,
}

impl AttributionStore {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(LinkhubError::database_config(
                "DATABASE_URL 未设置".to_string(),
            ));
        }

        let backend_name = infer_backend_from_url(&config.url)?;
        let retry_config = retry::RetryConfig {
            max_retries: config.retry_count,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
        };

        // 根据不同数据库类型配置连接选项
        let db = if backend_name == "sqlite" {
            connect_sqlite(&config.url).await?
        } else {
            connect_generic(&config.url, &backend_name, config.pool_size).await?
        };

        let store = AttributionStore {
            db,
            backend_name,
            retry_config,
        };

        // 运行迁移
        run_migrations(&store.db).await?;

        warn!("{} Storage initialized.", store.backend_name.to_uppercase());
        Ok(store)
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    /// 获取数据库连接（用于需要直接访问数据库的场景）
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
