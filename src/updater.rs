use std::time::Duration;

use log::info;
use tokio::time::sleep;

use crate::archive::{self, InstallStats};
use crate::error::Result;
use crate::launch::launch_successor;
use crate::options::{UpdateConfig, UpdaterOptions};
use crate::process_wait::{POLL_INTERVAL, ProcessProbe, SETTLE_DELAY, SysinfoProbe, wait_for_exit};

/// Summary of a completed run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub removed_files: usize,
    pub installed: InstallStats,
    pub launched_pid: Option<u32>,
}

/// Waits for the parent to exit, swaps the installed files, restarts the app.
pub struct Updater {
    config: UpdateConfig,
    probe: Box<dyn ProcessProbe>,
    poll_interval: Duration,
    settle_delay: Duration,
}

impl Updater {
    pub fn new(config: UpdateConfig) -> Self {
        Updater {
            config,
            probe: Box::new(SysinfoProbe::new()),
            poll_interval: POLL_INTERVAL,
            settle_delay: SETTLE_DELAY,
        }
    }

    #[cfg(test)]
    pub fn with_probe(mut self, probe: Box<dyn ProcessProbe>) -> Self {
        self.probe = probe;
        self
    }

    #[cfg(test)]
    pub fn with_timing(mut self, poll_interval: Duration, settle_delay: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.settle_delay = settle_delay;
        self
    }

    /// Run every step in order. Nothing is rolled back if a step fails.
    pub async fn run(mut self) -> Result<RunReport> {
        let config = &self.config;
        let mut report = RunReport::default();

        wait_for_exit(self.probe.as_mut(), config.pid, self.poll_interval).await?;
        sleep(self.settle_delay).await;

        if let Some(old_archive) = &config.old_archive {
            report.removed_files = archive::remove_listed_files(old_archive, &config.install_dir)?;
        }

        report.installed = archive::install_archive(&config.new_archive, &config.install_dir)?;

        if let Some(post_exec) = &config.post_exec {
            report.launched_pid = Some(launch_successor(post_exec)?);
        }

        info!("✔ Update complete.");
        Ok(report)
    }
}

/// Validate the command line and run the update with default timings.
pub async fn execute(options: UpdaterOptions) -> Result<RunReport> {
    let config = options.validate()?;
    Updater::new(config).run().await
}
