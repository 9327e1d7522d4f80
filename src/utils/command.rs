//! Running child processes with their output passed through redaction

use crate::utils::output::{SinkWriter, Terminal};
use crate::utils::redact::RedactWriter;
use std::io::{self, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use tracing::debug;

/// Where a child's stdout is sent. Its stderr always goes to our stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdoutTo {
    Stdout,
    Stderr,
}

/// Run `cmd` to completion, streaming its stdout and stderr through the
/// terminal's redacted writers.
pub fn run_streamed(cmd: &mut Command, terminal: &Terminal, stdout_to: StdoutTo) -> io::Result<ExitStatus> {
    cmd.stdin(Stdio::inherit());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    debug!("Running command: {:?}", cmd.get_program());

    let mut child = cmd.spawn()?;
    let child_stdout = child.stdout.take();
    let child_stderr = child.stderr.take();

    let out_writer = match stdout_to {
        StdoutTo::Stdout => terminal.stdout(),
        StdoutTo::Stderr => terminal.stderr(),
    };
    let err_writer = terminal.stderr();

    thread::scope(|scope| {
        let out = scope.spawn(move || forward(child_stdout, out_writer));
        let err = scope.spawn(move || forward(child_stderr, err_writer));
        join_forwarder(out);
        join_forwarder(err);
    });

    child.wait()
}

/// Run `cmd` to completion, capturing its stdout and streaming its stderr
/// through the terminal's redacted stderr.
pub fn run_capturing_stdout(cmd: &mut Command, terminal: &Terminal) -> io::Result<(ExitStatus, Vec<u8>)> {
    cmd.stdin(Stdio::inherit());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    debug!("Running command: {:?}", cmd.get_program());

    let mut child = cmd.spawn()?;
    let mut child_stdout = child.stdout.take();
    let child_stderr = child.stderr.take();
    let err_writer = terminal.stderr();

    let captured = thread::scope(|scope| {
        let err = scope.spawn(move || forward(child_stderr, err_writer));

        let mut captured = Vec::new();
        let read = match child_stdout.as_mut() {
            Some(pipe) => pipe.read_to_end(&mut captured).map(|_| ()),
            None => Ok(()),
        };

        join_forwarder(err);
        read.map(|_| captured)
    });

    let status = child.wait()?;
    Ok((status, captured?))
}

fn forward<R: Read>(pipe: Option<R>, mut writer: RedactWriter<SinkWriter>) -> io::Result<()> {
    if let Some(mut pipe) = pipe {
        io::copy(&mut pipe, &mut writer)?;
    }
    writer.finish()
}

fn join_forwarder(handle: thread::ScopedJoinHandle<'_, io::Result<()>>) {
    match handle.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Failed to forward child output: {}", e),
        Err(_) => debug!("Output forwarding thread panicked"),
    }
}

/// Human readable description of how a process ended
pub fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

/// Exit code to forward for a finished child
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// Write a whole message to a redacted writer and end the stream
pub fn emit(mut writer: RedactWriter<SinkWriter>, message: &str) -> io::Result<()> {
    writer.write_all(message.as_bytes())?;
    writer.finish()
}
