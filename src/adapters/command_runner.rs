use crate::domain::model::{Invocation, RunOutput};
use crate::domain::ports::ModelRunner;
use crate::utils::error::{ApiError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Lines of stderr kept in a `ModelFailed` error.
pub const STDERR_TAIL_LINES: usize = 20;

/// Spawns the model as a child process and waits for it, bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

pub fn tail_lines(text: &str, count: usize) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

/// Kills every process in the group led by `pid`, including children the model spawned.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else { return };
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) => tracing::debug!("Sent SIGKILL to process group {}", pid),
        Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => tracing::warn!("Failed to kill process group {}: {}", pid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[async_trait]
impl ModelRunner for CommandRunner {
    async fn run(&self, invocation: &Invocation) -> Result<RunOutput> {
        tracing::info!(
            "🚀 Running model: {} {} (cwd: {})",
            invocation.program,
            invocation.args.join(" "),
            invocation.cwd.display()
        );

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // 模型會再啟動子行程，放進獨立的 process group 以便整組終止
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|e| ApiError::ModelFailed {
            status: "spawn failed".to_string(),
            stderr_tail: format!("{}: {}", invocation.program, e),
        })?;
        let pid = child.id();

        let started = Instant::now();
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                kill_process_group(pid);
                tracing::error!("⏱️ Model run exceeded {:?}, killed", self.timeout);
                return Err(ApiError::ModelTimeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };
        let duration = started.elapsed();

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            tracing::error!("❌ Model exited with {}", output.status);
            return Err(ApiError::ModelFailed {
                status: output.status.to_string(),
                stderr_tail: tail_lines(&stderr, STDERR_TAIL_LINES).join("\n"),
            });
        }

        tracing::info!("✅ Model finished in {:.1}s", duration.as_secs_f64());
        tracing::debug!("Model stdout: {}", stdout);

        Ok(RunOutput {
            exit_code: output.status.code(),
            stdout,
            stderr,
            duration,
        })
    }
}
