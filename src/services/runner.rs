//! External decompiler invocation.
//!
//! The decompiler is a black box: it is started as `<tool> <file> -p -o <dir>`
//! and judged only by its exit status. Anything that goes wrong once the
//! output directory exists is a [`ToolError`]; failing to create the
//! directory is a setup error.

use crate::services::format::format_elapsed;
use crate::services::output;
use crate::{Error, Result, ToolError};
use crossbeam_channel::Receiver;
use std::env;
#[cfg(windows)]
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How long output is still gathered once a timed tool has exited or been killed.
const OUTPUT_GRACE: Duration = Duration::from_millis(100);

/// One decompiler run for one input file.
#[derive(Debug, Clone, Copy)]
pub struct ToolInvocation<'a> {
    pub tool: &'a Path,
    pub file: &'a Path,
    pub output_dir: &'a Path,
    /// Kill the tool if it runs longer than this.
    pub timeout: Option<Duration>,
}

impl ToolInvocation<'_> {
    fn command(&self) -> Command {
        let mut command = Command::new(self.tool);
        command
            .arg(self.file)
            .arg("-p")
            .arg("-o")
            .arg(self.output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    fn tool_error(&self, reason: String, output: String) -> Error {
        Error::Tool(ToolError {
            file: self.file.to_path_buf(),
            reason,
            output,
        })
    }
}

/// Run the decompiler against an (ensured) output directory.
///
/// # Returns
/// The tool's combined stdout and stderr on a zero exit status.
pub fn run_external_tool(invocation: &ToolInvocation<'_>) -> Result<String> {
    output::ensure_dir(invocation.output_dir)?;

    log::debug!(
        "Running {} on {}",
        invocation.tool.display(),
        invocation.file.display()
    );

    let child = invocation.command().spawn().map_err(|e| {
        invocation.tool_error(
            format!("failed to start '{}': {e}", invocation.tool.display()),
            String::new(),
        )
    })?;

    let finished = wait_for_exit(child, invocation.timeout).map_err(|e| {
        invocation.tool_error(format!("failed waiting for tool: {e}"), String::new())
    })?;

    let combined = combine_output(&finished.stdout, &finished.stderr);
    match finished.status {
        Some(status) if status.success() => Ok(combined),
        Some(status) => Err(invocation.tool_error(status.to_string(), combined)),
        None => Err(invocation.tool_error(
            format!(
                "timed out after {}",
                format_elapsed(invocation.timeout.unwrap_or_default())
            ),
            combined,
        )),
    }
}

struct Finished {
    /// `None` when the tool was killed for exceeding its timeout.
    status: Option<ExitStatus>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn wait_for_exit(mut child: Child, timeout: Option<Duration>) -> io::Result<Finished> {
    let Some(limit) = timeout else {
        let output = child.wait_with_output()?;
        return Ok(Finished {
            status: Some(output.status),
            stdout: output.stdout,
            stderr: output.stderr,
        });
    };

    // Drained on side threads: a tool's own children may keep the pipes
    // open long after the tool exits, so reads must never be joined.
    let stdout = child.stdout.take().map(drain).transpose()?;
    let stderr = child.stderr.take().map(drain).transpose()?;

    let deadline = Instant::now() + limit;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if Instant::now() >= deadline {
            // The child may exit on its own between the check and the kill.
            let _ = child.kill();
            child.wait()?;
            break None;
        }
        thread::sleep(POLL_INTERVAL);
    };

    let collect_until = deadline.max(Instant::now() + OUTPUT_GRACE);
    Ok(Finished {
        status,
        stdout: stdout.map(|rx| collect(&rx, collect_until)).unwrap_or_default(),
        stderr: stderr.map(|rx| collect(&rx, collect_until)).unwrap_or_default(),
    })
}

/// Forward everything read from `pipe` as chunks until EOF or until the
/// receiving side goes away.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> io::Result<Receiver<Vec<u8>>> {
    let (chunks, received) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("tool-output".to_string())
        .spawn(move || {
            let mut buf = [0u8; 8192];
            loop {
                match pipe.read(&mut buf) {
                    Ok(0) => return,
                    Ok(n) => {
                        if chunks.send(buf[..n].to_vec()).is_err() {
                            return;
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                    Err(_) => return,
                }
            }
        })?;
    Ok(received)
}

/// Gather chunks until the pipe closes or `until` passes, whichever is first.
fn collect(received: &Receiver<Vec<u8>>, until: Instant) -> Vec<u8> {
    let mut out = Vec::new();
    while let Ok(chunk) = received.recv_deadline(until) {
        out.extend_from_slice(&chunk);
    }
    out
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut combined = String::from_utf8_lossy(stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(stderr));
    combined
}

/// Locate an executable the way a shell would.
///
/// Names containing a path separator are checked directly; bare names are
/// looked up in each `PATH` entry.
#[must_use]
pub fn find_executable(name: &Path) -> Option<PathBuf> {
    if name.components().count() > 1 {
        return is_executable(name).then(|| name.to_path_buf());
    }

    let search_path = env::var_os("PATH")?;
    env::split_paths(&search_path)
        .flat_map(|dir| candidates(&dir, name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(windows)]
fn candidates(dir: &Path, name: &Path) -> Vec<PathBuf> {
    let plain = dir.join(name);
    let mut with_ext = OsString::from(plain.as_os_str());
    with_ext.push(".exe");
    vec![plain, PathBuf::from(with_ext)]
}

#[cfg(not(windows))]
fn candidates(dir: &Path, name: &Path) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
