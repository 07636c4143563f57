use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tracing::debug;

/// Bound on `<bin> --version` installation probes
pub const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Captured result of a finished external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs short-lived external programs under a hard timeout.
///
/// Implementations return `None` when the program could not be started,
/// failed while waiting, or exceeded its timeout. Callers treat `None` as
/// "unknown" and never turn it into a Block.
pub trait BinaryProbe {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Option<ProbeOutput>;

    /// Best-effort check that `program --version` exits successfully
    fn is_installed(&self, program: &str) -> bool {
        self.run(program, &["--version"], None, VERSION_PROBE_TIMEOUT)
            .is_some_and(|output| output.success)
    }
}

/// Probe backed by real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl BinaryProbe for SystemProbe {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Option<ProbeOutput> {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                debug!("Could not start probe runtime: {}", e);
                return None;
            }
        };

        runtime.block_on(run_bounded(program, args, cwd, timeout))
    }
}

/// Spawn `program` and wait for it, killing it if `timeout` elapses
pub async fn run_bounded(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Option<ProbeOutput> {
    let mut command = tokio::process::Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            debug!("Failed to spawn '{}': {}", program, e);
            return None;
        }
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Some(ProbeOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
        Ok(Err(e)) => {
            debug!("Failed to wait for '{}': {}", program, e);
            None
        }
        Err(_) => {
            debug!("'{}' timed out after {:?}", program, timeout);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_not_installed() {
        assert!(!SystemProbe.is_installed("ecc-guard-definitely-not-a-real-binary"));
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_times_out() {
        let started = std::time::Instant::now();
        let output = SystemProbe.run("sleep", &["5"], None, Duration::from_millis(200));
        assert!(output.is_none());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_captures_output() {
        let output = SystemProbe
            .run("echo", &["hello"], None, Duration::from_secs(2))
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "hello");
    }
}
