use resilient_fetch::{Fetcher, HttpResponse, Logger, LoggerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    let url = std::env::var("FETCH_URL")
        .unwrap_or_else(|_| "https://httpbin.org/status/503".to_owned());

    let log = Logger::with_config("demo", &LoggerConfig::from_env()?);
    let fetcher = Fetcher::from_env()?;

    log.info("start", &format!("fetching {url}"), None);
    let response = fetcher.get(&url).await?;

    if HttpResponse::ok(&response) {
        log.info("done", &format!("{} bytes", response.text().await?.len()), None);
    } else {
        log.warn("done", &format!("gave up with {}", response.status()), None);
    }

    Ok(())
}
