use tokio::process::Command;
use tracing::warn;

/// Run an opaque shell command, reporting only whether it exited with
/// status 0. Output is captured and discarded; failures to launch count as
/// command failures. No timeout is imposed here, so a long-running command
/// occupies its worker slot for the duration.
pub async fn execute(command: &str) -> bool {
    let command = normalize_command(command);

    match Command::new("sh").arg("-c").arg(command).output().await {
        Ok(output) => output.status.success(),
        Err(err) => {
            warn!("failed to launch command: {err}");
            false
        }
    }
}

/// Trim surrounding whitespace and strip exactly one pair of matching
/// single or double quotes bracketing the whole string. Payloads that went
/// through an extra layer of shell quoting arrive in that shape.
fn normalize_command(raw: &str) -> &str {
    let trimmed = raw.trim();
    let bytes = trimmed.as_bytes();

    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &trimmed[1..trimmed.len() - 1];
        }
    }

    trimmed
}
