//! Running the external XSLT processor.
//!
//! The processor is invoked as `<processor> -o <out> <stylesheet> <in>`
//! (the `xsltproc` command line).  Input, output and the captured stderr
//! all live in one temporary directory which is removed when this
//! function returns, whatever the outcome.

use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use thiserror::Error;

use crate::filter::CancelToken;

/// How often a running processor is polled for exit / cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// TransformError
// ---------------------------------------------------------------------------

/// Why a transform produced no output.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Temp-file or process I/O failed.
    #[error("transform I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The processor exited unsuccessfully.
    #[error("processor exited with code {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    /// The processor exited cleanly but wrote no output file.
    #[error("processor produced no output file")]
    MissingOutput,

    /// The job was cancelled and the processor killed.
    #[error("transform cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// run_transform
// ---------------------------------------------------------------------------

/// Transform `input` with `stylesheet`, blocking until the processor exits
/// or `cancel` is raised.
///
/// # Errors
///
/// See [`TransformError`].
pub fn run_transform(
    processor: &Path,
    stylesheet: &Path,
    input: &str,
    cancel: &CancelToken,
) -> Result<String, TransformError> {
    let dir = tempfile::Builder::new()
        .prefix("speech-filters-xslt-")
        .tempdir()?;
    let in_path = dir.path().join("input.xml");
    let out_path = dir.path().join("output.xml");
    let err_path = dir.path().join("stderr.log");

    std::fs::write(&in_path, input)?;
    let stderr = File::create(&err_path)?;

    let mut child = Command::new(processor)
        .arg("-o")
        .arg(&out_path)
        .arg(stylesheet)
        .arg(&in_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(stderr))
        .spawn()?;

    log::debug!(
        "xslt: spawned {} (pid {}) for {}",
        processor.display(),
        child.id(),
        stylesheet.display()
    );

    let status = loop {
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(TransformError::Cancelled);
        }
        match child.try_wait()? {
            Some(status) => break status,
            None => std::thread::sleep(POLL_INTERVAL),
        }
    };

    if !status.success() {
        let stderr = std::fs::read_to_string(&err_path).unwrap_or_default();
        return Err(TransformError::Exit {
            code: status.code(),
            stderr: stderr.trim().to_string(),
        });
    }

    match std::fs::read_to_string(&out_path) {
        Ok(output) => Ok(output),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(TransformError::MissingOutput),
        Err(e) => Err(e.into()),
    }
}
