//! Isolated execution of a package's attached retrieval program.
//!
//! The program runs in a subprocess under a hard wall-clock budget. A
//! non-zero exit rejects the download; exceeding the budget is a terminal
//! failure for that retrieval, not a retryable condition.

use crate::Result;
use crate::config::RegistryConfig;
use crate::error::{RegistryError, UpstreamContext};
use crate::model::PackageRecord;
use core::time::Duration;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const LOG_TARGET: &str = "   sandbox";

/// Run a retrieval program against a package about to be downloaded.
///
/// The program text is fed to the runtime on stdin, which both `node` and a
/// POSIX shell accept.
pub(crate) async fn run_program(config: &RegistryConfig, program: &str, record: &PackageRecord) -> Result<()> {
    log::debug!(target: LOG_TARGET, "Running retrieval program for package {}", record.id);

    let mut command = Command::new(&config.program_runtime);
    let _ = command
        .env("PACKAGE_ID", record.id.as_str())
        .env("PACKAGE_NAME", &record.name)
        .env("PACKAGE_VERSION", record.version.to_string())
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .upstream_with(|| format!("unable to launch program runtime '{}'", config.program_runtime))?;

    if let Some(mut stdin) = child.stdin.take() {
        // A program that exits before reading its source closes the pipe
        // early; its exit status is what matters.
        if let Err(e) = stdin.write_all(program.as_bytes()).await {
            log::debug!(target: LOG_TARGET, "Retrieval program for package {} closed stdin early: {e}", record.id);
        }
    }

    let budget = Duration::from_secs(config.program_timeout_secs);
    let status = match tokio::time::timeout(budget, child.wait()).await {
        Ok(outcome) => outcome.upstream_with(|| format!("retrieval program for package {} could not be awaited", record.id))?,
        Err(_) => {
            log::debug!(target: LOG_TARGET, "Retrieval program for package {} timed out", record.id);
            return Err(RegistryError::ProgramTimeout {
                timeout_secs: config.program_timeout_secs,
            });
        }
    };

    if !status.success() {
        let code = status.code().unwrap_or(-1);
        log::debug!(target: LOG_TARGET, "Retrieval program for package {} exited with status {code}", record.id);
        return Err(RegistryError::ProgramRejected { status: code });
    }

    Ok(())
}
