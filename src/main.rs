use anyhow::Result;

use linkhub::config::AppConfig;
use linkhub::runtime::run_server;
use linkhub::system::init_logging;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    // guard 必须存活到进程结束，否则日志缓冲不会刷出
    let _guard = init_logging(&config.logging);

    run_server(config).await
}
