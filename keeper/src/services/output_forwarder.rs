//! Helper to handle worker stdout/stderr output
//!
//! Worker output is either piped and re-emitted line by line through the
//! keeper's tracing subscriber (tagged with the worker name), or discarded.
//! Piped output is always drained so a chatty worker never blocks on a full pipe.

use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use shared::{process_debug, process_info, ComponentId};

/// Configure stdio for a worker process
pub fn configure_child_stdio(cmd: &mut Command, forward_output: bool) {
    if forward_output {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).stdin(Stdio::null());
    } else {
        cmd.stdout(Stdio::null()).stderr(Stdio::null()).stdin(Stdio::null());
    }
}

/// Spawn tasks that forward any piped output of `child` into the log
pub fn spawn_output_forwarders(child: &mut Child, worker: &str) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, worker.to_string(), "stdout"));
    }

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, worker.to_string(), "stderr"));
    }
}

async fn forward_lines<R>(stream: R, worker: String, stream_name: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                // Worker output need not be UTF-8; keep draining either way
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                process_info!(ComponentId::current(), worker = %worker, stream = stream_name, "   {}", line);
            }
            Err(e) => {
                process_debug!(ComponentId::current(), worker = %worker, "output stream closed: {}", e);
                break;
            }
        }
    }
}
