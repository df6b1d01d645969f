use crate::pipeline::{RelayPipeline, TickReport};
use crate::rss_utils::time::format_duration;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Runs the pipeline once immediately and then on a fixed interval until
/// Ctrl-C. Ticks never overlap; a tick that overruns the interval skips the
/// missed ones.
pub struct Scheduler {
    pipeline: RelayPipeline,
    interval: Duration,
}

impl Scheduler {
    pub fn new(pipeline: RelayPipeline, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    pub fn pipeline(&self) -> &RelayPipeline {
        &self.pipeline
    }

    /// A single pass over every feed.
    pub async fn run_once(&self) -> TickReport {
        self.pipeline.run_tick().await
    }

    pub async fn run(&self) {
        info!(
            "Watching {} feeds every {}",
            self.pipeline.feed_urls().len(),
            format_duration(self.interval)
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.pipeline.run_tick().await;
                    if report.failed() > 0 {
                        warn!(
                            "{} of {} feeds failed this tick, next attempt in {}",
                            report.failed(),
                            report.feeds.len(),
                            format_duration(self.interval)
                        );
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
            }
        }
    }
}
