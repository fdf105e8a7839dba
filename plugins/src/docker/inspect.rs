use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use logtail_core::api::{InspectError, ProcessInspector, ProcessState};

/// Reads container state through `docker inspect`.
#[derive(Debug, Clone)]
pub struct DockerInspector {
    binary: String,
}

impl DockerInspector {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

#[derive(Debug, Deserialize)]
struct InspectRecord {
    #[serde(rename = "State")]
    state: StateRecord,
    #[serde(rename = "Config", default)]
    config: ConfigRecord,
}

#[derive(Debug, Deserialize)]
struct StateRecord {
    #[serde(rename = "Running", default)]
    running: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigRecord {
    #[serde(rename = "Tty", default)]
    tty: bool,
}

pub(crate) fn inspect_args(process_id: &str) -> Vec<String> {
    vec![
        "inspect".to_string(),
        "--type".to_string(),
        "container".to_string(),
        process_id.to_string(),
    ]
}

pub(crate) fn parse_inspect(process_id: &str, stdout: &[u8]) -> Result<ProcessState, InspectError> {
    let records: Vec<InspectRecord> =
        serde_json::from_slice(stdout).map_err(|e| InspectError::Failed {
            process: process_id.to_string(),
            reason: format!("unreadable inspect output: {e}"),
        })?;
    let record = records
        .into_iter()
        .next()
        .ok_or_else(|| InspectError::NotFound(process_id.to_string()))?;
    Ok(ProcessState {
        running: record.state.running,
        tty: record.config.tty,
    })
}

pub(crate) fn classify_failure(process_id: &str, stderr: &[u8]) -> InspectError {
    let msg = String::from_utf8_lossy(stderr).trim().to_string();
    if msg.contains("No such") || msg.contains("no such") {
        InspectError::NotFound(process_id.to_string())
    } else {
        InspectError::Failed {
            process: process_id.to_string(),
            reason: if msg.is_empty() {
                "docker inspect exited unsuccessfully".to_string()
            } else {
                msg
            },
        }
    }
}

#[async_trait]
impl ProcessInspector for DockerInspector {
    async fn inspect(&self, process_id: &str) -> Result<ProcessState, InspectError> {
        let output = Command::new(&self.binary)
            .args(inspect_args(process_id))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| InspectError::Failed {
                process: process_id.to_string(),
                reason: format!("failed to run {}: {e}", self.binary),
            })?;

        if !output.status.success() {
            return Err(classify_failure(process_id, &output.stderr));
        }
        let state = parse_inspect(process_id, &output.stdout)?;
        tracing::trace!(process = process_id, running = state.running, tty = state.tty, "inspected");
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_running_and_tty() {
        let out = br#"[{"Id":"abc","State":{"Status":"running","Running":true},"Config":{"Tty":true}}]"#;
        assert_eq!(
            parse_inspect("abc", out).unwrap(),
            ProcessState {
                running: true,
                tty: true
            }
        );
    }

    #[test]
    fn missing_config_means_no_tty() {
        let out = br#"[{"State":{"Running":false}}]"#;
        assert_eq!(
            parse_inspect("abc", out).unwrap(),
            ProcessState {
                running: false,
                tty: false
            }
        );
    }

    #[test]
    fn empty_result_is_not_found() {
        assert!(matches!(
            parse_inspect("abc", b"[]"),
            Err(InspectError::NotFound(id)) if id == "abc"
        ));
    }

    #[test]
    fn garbage_is_a_failure() {
        assert!(matches!(
            parse_inspect("abc", b"Error"),
            Err(InspectError::Failed { .. })
        ));
    }

    #[test]
    fn missing_container_stderr_is_not_found() {
        let err = classify_failure("web", b"Error: No such container: web\n");
        assert!(matches!(err, InspectError::NotFound(id) if id == "web"));

        let err = classify_failure("web", b"Cannot connect to the Docker daemon\n");
        assert!(matches!(
            err,
            InspectError::Failed { reason, .. } if reason == "Cannot connect to the Docker daemon"
        ));
    }

    #[test]
    fn args_target_containers_only() {
        assert_eq!(
            inspect_args("web"),
            vec!["inspect", "--type", "container", "web"]
        );
    }
}
