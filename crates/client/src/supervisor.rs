// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Control server process lifecycle: validate, spawn, handshake, kill.
//!
//! The control server prints its listening port as the first line of stdout.
//! Anything printed before that is diagnostic noise; it is forwarded to
//! `tracing` and kept for the error report if the handshake fails.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rcc_core::{Error, Result};

use crate::config::SupervisorConfig;

/// A running control server child process.
///
/// Dropping a `ChildProcess` kills the child if it is still running.
pub struct ChildProcess {
    child: Child,
    path: PathBuf,
    port: u16,
    reaped: bool,
}

impl ChildProcess {
    /// Port the control server listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Kill the child and reap it.
    pub fn kill(&mut self) -> Result<()> {
        if self.reaped {
            return Ok(());
        }
        if let Err(e) = self.child.kill() {
            // Already exited; reaping below still succeeds.
            tracing::debug!("kill {}: {}", self.child.id(), e);
        }
        self.child.wait()?;
        self.reaped = true;
        Ok(())
    }

    /// Wait up to `grace` for the child to exit on its own.
    ///
    /// Returns the exit status, or `None` if the child is still running.
    pub fn wait_timeout(&mut self, grace: Duration) -> Result<Option<ExitStatus>> {
        let deadline = Instant::now() + grace;
        loop {
            if let Some(status) = self.child.try_wait()? {
                self.reaped = true;
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Exit status if the child has already exited.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        if status.is_some() {
            self.reaped = true;
        }
        Ok(status)
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.kill();
        }
    }
}

/// Check that `path` names an existing, executable regular file.
pub fn validate_binary(path: &Path) -> Result<()> {
    let not_found = |reason: String| Error::BinaryNotFound {
        path: path.display().to_string(),
        reason,
    };
    let meta = std::fs::metadata(path).map_err(|e| not_found(e.to_string()))?;
    if !meta.is_file() {
        return Err(not_found("not a regular file".to_string()));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            return Err(not_found("not executable".to_string()));
        }
    }
    Ok(())
}

enum StdoutLine {
    Port(u16),
    Noise(String),
}

/// Spawn the control server at `path` and wait for its port.
///
/// `label` prefixes forwarded child output, normally the test context id.
pub fn spawn(path: &Path, config: &SupervisorConfig, label: &str) -> Result<ChildProcess> {
    validate_binary(path)?;

    let mut command = Command::new(path);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in &config.env {
        command.env(key, value);
    }
    let mut child = command.spawn().map_err(|e| Error::Spawn {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    tracing::debug!("spawned {} as pid {}", path.display(), child.id());

    let stderr_lines = Arc::new(Mutex::new(Vec::new()));
    if let Some(stderr) = child.stderr.take() {
        forward_stderr(stderr, label, Arc::clone(&stderr_lines));
    }
    let rx = match child.stdout.take() {
        Some(stdout) => watch_stdout(stdout, label),
        None => mpsc::channel().1,
    };

    let mut noise = Vec::new();
    let deadline = Instant::now() + config.handshake_timeout;
    let failure = loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(StdoutLine::Port(port)) => {
                tracing::debug!("{} listening on port {}", path.display(), port);
                return Ok(ChildProcess {
                    child,
                    path: path.to_path_buf(),
                    port,
                    reaped: false,
                });
            }
            Ok(StdoutLine::Noise(line)) => noise.push(line),
            Err(RecvTimeoutError::Timeout) => break None,
            Err(RecvTimeoutError::Disconnected) => break Some("stdout closed"),
        }
    };

    let _ = child.kill();
    let status = child.wait().ok();
    let mut output = Vec::new();
    if let Some(reason) = failure {
        output.push(format!("  {} before the port was written", reason));
    }
    if let Some(status) = status {
        output.push(format!("  process exited: {}", status));
    }
    output.extend(noise.iter().map(|l| format!("  stdout: {}", l)));
    let stderr = stderr_lines.lock().unwrap_or_else(|e| e.into_inner());
    output.extend(stderr.iter().map(|l| format!("  stderr: {}", l)));

    Err(Error::Handshake {
        path: path.display().to_string(),
        output: output.join("\n"),
    })
}

/// Read stdout lines on a background thread.
///
/// The first line parsing as a port is sent as [`StdoutLine::Port`]; other
/// lines before it are sent as noise. Every other line is only logged.
fn watch_stdout<R: Read + Send + 'static>(
    stdout: R,
    label: &str,
) -> mpsc::Receiver<StdoutLine> {
    let (tx, rx) = mpsc::channel();
    let label = label.to_string();
    let spawned = thread::Builder::new()
        .name("child-stdout".to_string())
        .spawn(move || {
            let mut handshake_done = false;
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if !handshake_done {
                    if let Ok(port) = line.parse::<u16>() {
                        handshake_done = true;
                        let _ = tx.send(StdoutLine::Port(port));
                        continue;
                    }
                    let _ = tx.send(StdoutLine::Noise(line.clone()));
                }
                tracing::info!("[{}] {}", label, line);
            }
        });
    if let Err(e) = spawned {
        tracing::warn!("cannot watch child stdout: {}", e);
    }
    rx
}

fn forward_stderr<R: Read + Send + 'static>(
    stderr: R,
    label: &str,
    captured: Arc<Mutex<Vec<String>>>,
) {
    let label = label.to_string();
    let spawned = thread::Builder::new()
        .name("child-stderr".to_string())
        .spawn(move || {
            for line in BufReader::new(stderr).lines() {
                let Ok(line) = line else { break };
                tracing::info!("[{}] {}", label, line);
                let mut captured = captured.lock().unwrap_or_else(|e| e.into_inner());
                if captured.len() < MAX_CAPTURED_LINES {
                    captured.push(line);
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!("cannot watch child stderr: {}", e);
    }
}

const MAX_CAPTURED_LINES: usize = 200;

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
