use anyhow::Result;
use env_logger::Env;
use log::info;

use commcal::api_server;
use commcal::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with custom format
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use chrono::Local;
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    info!("Starting Community Calendar server");

    let config = Config::load()?;
    api_server::start_api_server(config).await
}
