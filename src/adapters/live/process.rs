//! Process-group ownership for spawned helper programs.

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;

/// Kills a child's whole process group when dropped.
///
/// Children must be spawned with `process_group(0)` so the group id equals
/// the child's pid and covers everything the command started, not just the
/// `sh -c` wrapper.
#[derive(Debug)]
pub(crate) struct ProcessGroup {
    pgid: Option<Pid>,
}

impl ProcessGroup {
    /// Own the group led by `pid`. `None` (child already reaped) owns nothing.
    pub(crate) fn led_by(pid: Option<u32>) -> Self {
        Self { pgid: pid.and_then(|p| i32::try_from(p).ok()).map(Pid::from_raw) }
    }

    /// SIGKILL every process in the group. Later calls do nothing.
    pub(crate) fn kill(&mut self) {
        let Some(pgid) = self.pgid.take() else { return };
        match killpg(pgid, Signal::SIGKILL) {
            // ESRCH: every member already exited.
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => tracing::warn!(pgid = pgid.as_raw(), error = %e, "failed to kill process group"),
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// True while `pid` exists and is not a zombie.
#[cfg(all(test, target_os = "linux"))]
pub(crate) fn is_running(pid: u32) -> bool {
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| stat.rsplit_once(')').map(|(_, rest)| rest.trim_start().starts_with('Z')))
        .is_some_and(|zombie| !zombie)
}

/// Poll until `pid` is gone or about a second has passed.
#[cfg(all(test, target_os = "linux"))]
pub(crate) async fn wait_gone(pid: u32) -> bool {
    for _ in 0..50 {
        if !is_running(pid) {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    false
}
