//! Shared subprocess execution helper.

use crate::{Error, Result};
use std::process::{Command, Output};
use tracing::debug;

/// Run an external tool, logging its stderr at debug level.
///
/// Maps a missing executable to `ToolNotFound` and a nonzero exit status to
/// `ToolFailed` carrying the tool's stderr.
pub(crate) fn run(tool: &str, cmd: &mut Command) -> Result<Output> {
    debug!("running {}: {:?}", tool, cmd);

    let output = cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::tool_not_found(tool)
        } else {
            Error::Io(e)
        }
    })?;

    for line in String::from_utf8_lossy(&output.stderr).lines() {
        debug!("{} stderr: {}", tool, line);
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed(tool, stderr.to_string()));
    }

    Ok(output)
}
