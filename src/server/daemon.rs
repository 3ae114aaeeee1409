//! Daemonisation
//!
//! Detaches the server from the controlling terminal with the classic
//! double-fork, writes a PID file, and redirects stdout/stderr to log files
//! under `/tmp`. The artifacts are removed again on orderly shutdown.

use anyhow::{bail, Context, Result};
use std::ffi::CString;
use std::fs;
use std::path::Path;

pub const PID_FILE: &str = "/tmp/server_daemon.pid";
pub const STDOUT_LOG: &str = "/tmp/server_stdout.log";
pub const STDERR_LOG: &str = "/tmp/server_stderr.log";

/// Artifacts a stopped daemon must not leave behind.
const CLEANUP_PATHS: &[&str] = &[
    PID_FILE,
    STDOUT_LOG,
    STDERR_LOG,
    "/tmp/cert.pem",
    "/tmp/key.pem",
    "/tmp/config.txt",
];

/// Detaches the calling process. The parent and the intermediate child exit;
/// only the daemonised grandchild returns from this function.
///
/// Must run before the async runtime starts: forking a process with live
/// runtime threads is undefined behaviour territory.
pub fn daemonize() -> Result<()> {
    match unsafe { libc::fork() } {
        -1 => bail!("first fork failed"),
        0 => {}
        _parent => {
            // Parent waits for the intermediate child, then exits.
            unsafe {
                let mut status: libc::c_int = 0;
                libc::wait(&mut status);
            }
            std::process::exit(0);
        }
    }

    if unsafe { libc::setsid() } == -1 {
        bail!("setsid failed");
    }

    // Second fork prevents the daemon from reacquiring a controlling terminal.
    match unsafe { libc::fork() } {
        -1 => bail!("second fork failed"),
        0 => {}
        _child => std::process::exit(0),
    }

    redirect_stdio()?;

    fs::write(PID_FILE, format!("{}\n", std::process::id()))
        .with_context(|| format!("writing PID file {}", PID_FILE))?;

    Ok(())
}

/// Removes the PID file and every `/tmp` artifact a daemon run produces.
pub fn remove_artifacts() {
    for path in CLEANUP_PATHS {
        if Path::new(path).exists() {
            if let Err(e) = fs::remove_file(path) {
                tracing::warn!("Failed to remove daemon artifact {}: {}", path, e);
            }
        }
    }
}

fn redirect_stdio() -> Result<()> {
    let devnull = CString::new("/dev/null").expect("static path");
    let stdout_log = CString::new(STDOUT_LOG).expect("static path");
    let stderr_log = CString::new(STDERR_LOG).expect("static path");

    unsafe {
        let null_fd = libc::open(devnull.as_ptr(), libc::O_RDONLY);
        if null_fd == -1 {
            bail!("cannot open /dev/null");
        }
        libc::dup2(null_fd, 0);
        if null_fd > 2 {
            libc::close(null_fd);
        }

        let flags = libc::O_WRONLY | libc::O_CREAT | libc::O_APPEND;
        let out_fd = libc::open(stdout_log.as_ptr(), flags, 0o644);
        if out_fd == -1 {
            bail!("cannot open {}", STDOUT_LOG);
        }
        libc::dup2(out_fd, 1);
        if out_fd > 2 {
            libc::close(out_fd);
        }

        let err_fd = libc::open(stderr_log.as_ptr(), flags, 0o644);
        if err_fd == -1 {
            bail!("cannot open {}", STDERR_LOG);
        }
        libc::dup2(err_fd, 2);
        if err_fd > 2 {
            libc::close(err_fd);
        }
    }

    Ok(())
}
