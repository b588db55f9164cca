//! Web 服务器主程序入口

use pagesnap::core::SnapshotOptions;
use pagesnap::web::{WebConfig, WebServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pagesnap=info,tower_http=warn".into()),
        )
        .init();

    let config = WebConfig::from_env();
    if let Err(e) = config.validate() {
        eprintln!("配置错误: {}", e);
        std::process::exit(1);
    }

    let server = WebServer::new(config, SnapshotOptions::default());
    server.start().await?;

    Ok(())
}
