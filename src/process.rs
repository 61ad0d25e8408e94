//! Blocking execution of external tools with captured output.

use std::ffi::OsString;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("spawning {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exceeded timeout ({timeout:?})", program.display())]
    Timeout {
        program: PathBuf,
        timeout: Duration,
        output: ToolOutput,
    },

    #[error("waiting for {}: {source}", program.display())]
    Wait {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: Option<ExitStatus>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.is_some_and(|s| s.success())
    }

    pub fn code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }

    /// Both streams as text, stdout first.
    pub fn combined(&self) -> String {
        let mut out = String::from_utf8_lossy(&self.stdout).into_owned();
        let err = String::from_utf8_lossy(&self.stderr);
        if !out.is_empty() && !err.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&err);
        out
    }
}

/// A single external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs to completion, never interpreting the exit status.
    pub fn run(&self) -> Result<ToolOutput, ProcessError> {
        debug!(
            "exec {} args={:?} timeout={:?}",
            self.program.display(),
            self.args,
            self.timeout
        );

        let mut child = self.spawn()?;
        wait_with_timeout(&mut child, &self.program, self.timeout)
    }

    fn spawn(&self) -> Result<Child, ProcessError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        // A tool written to disk moments ago can still be held open for
        // writing by a concurrent fork; ETXTBSY clears once that child execs.
        let mut attempts = 0;
        loop {
            match cmd.spawn() {
                Ok(child) => return Ok(child),
                Err(e) if is_text_busy(&e) && attempts < 5 => {
                    attempts += 1;
                    std::thread::sleep(Duration::from_millis(20 * attempts));
                }
                Err(source) => {
                    return Err(ProcessError::Spawn {
                        program: self.program.clone(),
                        source,
                    });
                }
            }
        }
    }
}

#[cfg(unix)]
const ETXTBSY: i32 = 26;

#[cfg(unix)]
fn is_text_busy(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(ETXTBSY)
}

#[cfg(not(unix))]
fn is_text_busy(_: &std::io::Error) -> bool {
    false
}

/// How long readers get to hit EOF once the limit is spent.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

fn wait_with_timeout(
    child: &mut Child,
    program: &Path,
    timeout: Option<Duration>,
) -> Result<ToolOutput, ProcessError> {
    // Drain pipes while waiting so a chatty tool can't block on a full buffer.
    let stdout = Drain::spawn(child.stdout.take());
    let stderr = Drain::spawn(child.stderr.take());

    let wait_err = |source| ProcessError::Wait {
        program: program.to_path_buf(),
        source,
    };

    let start = Instant::now();
    let (status, timed_out) = loop {
        if let Some(status) = child.try_wait().map_err(wait_err)? {
            break (Some(status), false);
        }

        if let Some(limit) = timeout {
            if start.elapsed() > limit {
                warn!("{} timed out after {:?}", program.display(), limit);
                let _ = child.kill();
                let status = child.wait().map_err(wait_err)?;
                break (Some(status), true);
            }
        }

        std::thread::sleep(Duration::from_millis(25));
    };

    // Grandchildren can keep the pipes open after the child is gone, so the
    // readers are only waited on until the limit (plus a grace period).
    let deadline = timeout.map(|limit| (start + limit).max(Instant::now() + DRAIN_GRACE));
    let output = ToolOutput {
        status,
        stdout: stdout.collect(deadline),
        stderr: stderr.collect(deadline),
    };

    match timeout {
        Some(timeout) if timed_out => Err(ProcessError::Timeout {
            program: program.to_path_buf(),
            timeout,
            output,
        }),
        _ => Ok(output),
    }
}

/// Background reader for one output pipe.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<()>,
}

impl Drain {
    fn spawn<R: Read + Send + 'static>(reader: Option<R>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let handle = std::thread::spawn(move || {
            let Some(mut r) = reader else { return };
            let mut chunk = [0u8; 8192];
            loop {
                match r.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => sink
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend_from_slice(&chunk[..n]),
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!("reading tool output: {e}");
                        break;
                    }
                }
            }
        });
        Self { buf, handle }
    }

    /// Everything read so far. Waits for EOF, but not past `deadline`; a
    /// reader still blocked then is left detached.
    fn collect(self, deadline: Option<Instant>) -> Vec<u8> {
        match deadline {
            None => {
                let _ = self.handle.join();
            }
            Some(deadline) => {
                while !self.handle.is_finished() && Instant::now() < deadline {
                    std::thread::sleep(Duration::from_millis(5));
                }
            }
        }
        std::mem::take(&mut *self.buf.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
