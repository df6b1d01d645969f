use anyhow::Context;
use clap::Parser;
use rss_relay::{
    Cli, Fetcher, MediaResolver, MisskeyClient, Normalizer, Publisher, RelayPipeline, RssFeedSource, Scheduler,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Cli::parse().into_config().context("invalid configuration")?;

    info!("Starting RSS relay for {} feeds", config.feed_urls.len());
    info!("Posting to {} as {} notes", config.misskey_host, config.visibility.as_str());

    let source = Arc::new(RssFeedSource::new(config.fetch.clone()).context("failed to build feed client")?);
    let downloader = Arc::new(Fetcher::new(config.fetch.clone()).context("failed to build media client")?);
    let misskey = Arc::new(
        MisskeyClient::new(&config.misskey_host, config.auth_token.clone(), config.request_timeout)
            .context("failed to build Misskey client")?,
    );

    let resolver = MediaResolver::new(misskey.clone(), downloader, config.match_strategy, config.retry);
    let publisher = Publisher::new(misskey, config.visibility);
    let pipeline = RelayPipeline::new(
        &config.feed_urls,
        config.dedup_strategy,
        source,
        Normalizer::new(config.quote_marker.clone()),
        resolver,
        publisher,
    )
    .with_prime_on_start(config.prime_on_start);

    let scheduler = Scheduler::new(pipeline, config.poll_interval);

    if config.run_once {
        let report = scheduler.run_once().await;
        if report.failed() > 0 {
            error!("Single pass finished with failures");
            anyhow::bail!("{} of {} feeds failed", report.failed(), report.feeds.len());
        }
    } else {
        scheduler.run().await;
    }

    info!("RSS relay finished");
    Ok(())
}
