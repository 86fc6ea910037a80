//! External process execution.
//!
//! Renders and scans shell out to ffmpeg. [`CommandRunner`] is the seam
//! between the pipeline and the operating system so tests can substitute a
//! recording fake.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;
use shortmaker_common::error::{ShortsError, ShortsResult};

/// How long ffmpeg may report no progress before we log a warning.
const STALL_WARNING: Duration = Duration::from_secs(10);

/// A program and its argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Value following `flag`, e.g. the graph after `-filter_complex`.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains([' ', '\'', ';']) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl ProcessOutcome {
    /// Last `max_chars` characters of stderr, trimmed.
    pub fn stderr_tail(&self, max_chars: usize) -> String {
        diagnostic_tail(&self.stderr, max_chars)
    }
}

/// Runs external programs to completion.
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` and wait for it.
    ///
    /// `Err` means the process could not be started or waited on; a
    /// process that ran and failed is an `Ok` outcome with `success == false`.
    fn run(&self, invocation: &Invocation) -> ShortsResult<ProcessOutcome>;
}

/// Encoder progress parsed from `-progress pipe:1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderProgress {
    /// Output timestamp reached so far, in seconds.
    pub out_time_secs: f64,
    /// Wall-clock time since the process started.
    pub elapsed_secs: f64,
    /// True once ffmpeg reports `progress=end`.
    pub complete: bool,
}

/// Progress callback for render processes.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send + Sync>;

/// [`CommandRunner`] backed by real child processes.
///
/// Stdout is read line by line for `key=value` progress reports while
/// stderr is drained on a separate thread.
#[derive(Default)]
pub struct SystemRunner {
    progress: Option<ProgressCallback>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }
}

impl fmt::Debug for SystemRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemRunner")
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> ShortsResult<ProcessOutcome> {
        tracing::debug!(command = %invocation, "Running process");
        let started = Instant::now();

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ShortsError::process(format!("Failed to start {}: {e}", invocation.program))
            })?;

        tracing::debug!(
            pid = child.id(),
            program = %invocation.program,
            args_len = invocation.args.len(),
            "Process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ShortsError::process("Failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ShortsError::process("Failed to capture stderr"))?;

        // A full stderr pipe would block ffmpeg.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut bytes = Vec::new();
            match reader.read_to_end(&mut bytes) {
                Ok(_) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(err) => format!("<failed to read stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let mut state = ProgressState::default();
        let mut last_advance_secs = 0.0f64;
        let mut last_advance_wall = Instant::now();

        loop {
            line.clear();
            let bytes = match reader.read_line(&mut line) {
                Ok(bytes) => bytes,
                Err(err) => {
                    // Reap the child and the stderr reader before bailing out.
                    if let Err(kill_err) = child.kill() {
                        tracing::warn!(error = %kill_err, "Failed to kill process");
                    }
                    let _ = child.wait();
                    let _ = stderr_task.join();
                    return Err(ShortsError::process(format!(
                        "Failed reading progress: {err}"
                    )));
                }
            };
            if bytes == 0 {
                break;
            }

            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            state.update(key, value);
            if key != "progress" {
                continue;
            }

            if state.out_time_secs > last_advance_secs + 0.001 {
                last_advance_secs = state.out_time_secs;
                last_advance_wall = Instant::now();
            } else if last_advance_wall.elapsed() >= STALL_WARNING {
                tracing::warn!(
                    out_time_secs = state.out_time_secs,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "No progress for 10s"
                );
                last_advance_wall = Instant::now();
            }

            let report = state.report(started.elapsed().as_secs_f64());
            tracing::trace!(out_time_secs = report.out_time_secs, "Encode progress");
            if let Some(cb) = &self.progress {
                cb(report);
            }
        }

        let status = child
            .wait()
            .map_err(|e| ShortsError::process(format!("Failed to wait on process: {e}")))?;
        let stderr = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        tracing::debug!(
            status = %status,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Process finished"
        );

        Ok(ProcessOutcome {
            success: status.success(),
            exit_code: status.code(),
            stderr,
        })
    }
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }

    fn report(&self, elapsed_secs: f64) -> RenderProgress {
        RenderProgress {
            out_time_secs: self.out_time_secs,
            elapsed_secs,
            complete: self.complete,
        }
    }
}

/// The last `max_chars` characters of `text`, trimmed of surrounding
/// whitespace. Never splits a character.
pub fn diagnostic_tail(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
