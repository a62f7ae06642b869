use std::time::Duration;

use log::{debug, info};
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};
use tokio::time::sleep;

use crate::error::{Result, UpdateError};

/// Poll interval while the parent process is still alive.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Extra delay after exit so the OS can release the parent's file handles.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Answers whether a pid still maps to a live process.
pub trait ProcessProbe {
    fn exists(&mut self, pid: u32) -> Result<bool>;
}

/// Process table lookup through `sysinfo`.
pub struct SysinfoProbe {
    sys: System,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        SysinfoProbe { sys: System::new() }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SysinfoProbe {
    fn exists(&mut self, pid: u32) -> Result<bool> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(UpdateError::ProcessQuery {
                pid,
                reason: "process table is not available on this platform".into(),
            });
        }

        let pid = Pid::from_u32(pid);
        // Only the queried pid is refreshed; dead entries are dropped.
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing(),
        );

        // A zombie has already released its files.
        Ok(self
            .sys
            .process(pid)
            .is_some_and(|p| p.status() != ProcessStatus::Zombie))
    }
}

/// Block until `pid` no longer exists. There is no timeout.
///
/// A pid that cannot name a process (negative or too large) counts as
/// already gone.
pub async fn wait_for_exit<P: ProcessProbe + ?Sized>(
    probe: &mut P,
    pid: i64,
    poll_interval: Duration,
) -> Result<()> {
    let Ok(pid) = u32::try_from(pid) else {
        debug!("Pid {} is not a valid process id, nothing to wait for", pid);
        return Ok(());
    };

    let mut polls = 0u64;
    while probe.exists(pid)? {
        if polls == 0 {
            info!("Waiting for process {} to exit...", pid);
        }
        polls += 1;
        sleep(poll_interval).await;
    }
    debug!("Process {} gone after {} polls", pid, polls);
    Ok(())
}
