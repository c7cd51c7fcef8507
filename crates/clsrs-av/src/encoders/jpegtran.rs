//! jpegtran wrapper for lossless JPEG repacking.

use crate::{Error, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

/// Repack a JPEG bitstream with arithmetic coding, keeping all metadata.
///
/// This is a lossless transform: the decoded image is identical, only the
/// entropy coding changes.
pub fn arithmetic_repack(source: &[u8]) -> Result<Vec<u8>> {
    debug!("running jpegtran arithmetic repack ({} bytes in)", source.len());

    let mut child = Command::new("jpegtran")
        .args(["-copy", "all", "-arithmetic"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found("jpegtran")
            } else {
                Error::Io(e)
            }
        })?;

    child
        .stdin
        .take()
        .ok_or_else(|| Error::tool_failed("jpegtran", "stdin unavailable"))?
        .write_all(source)?;

    let output = child.wait_with_output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed("jpegtran", stderr.to_string()));
    }
    if output.stdout.is_empty() {
        return Err(Error::empty_output("jpegtran"));
    }
    Ok(output.stdout)
}
