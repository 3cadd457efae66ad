//! Remote command execution in pods
//!
//! Runs a command through the pod `exec` subresource and collects its
//! output and exit code.

use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::api::{Api, AttachParams};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use super::client::K8sClient;
use super::pod::ReadyPod;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to start exec in {pod}: {message}")]
    Setup { pod: String, message: String },

    #[error("exec stream in {pod} failed: {message} (stderr: {stderr:?})")]
    Stream {
        pod: String,
        message: String,
        stderr: String,
    },

    #[error("exec in {pod} timed out after {}s", timeout.as_secs())]
    Timeout { pod: String, timeout: Duration },
}

/// Captured result of a finished command
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code reported by the kubelet, when it reported one
    pub exit_code: Option<i32>,
    /// Message of a failure status, e.g. when the binary could not be started
    pub status_message: Option<String>,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Decode the exit code from the terminal status of an exec session.
///
/// `Success` means 0; a non-zero exit is reported as a `Failure` with reason
/// `NonZeroExitCode` and an `ExitCode` cause holding the code.
pub fn exit_code(status: &Status) -> Option<i32> {
    if status.status.as_deref() == Some("Success") {
        return Some(0);
    }

    status
        .details
        .as_ref()?
        .causes
        .as_ref()?
        .iter()
        .find(|cause| cause.reason.as_deref() == Some("ExitCode"))
        .and_then(|cause| cause.message.as_deref()?.trim().parse().ok())
}

async fn read_all<R>(reader: Option<R>) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Executes commands in pods of one cluster
pub struct PodExecutor {
    client: K8sClient,
    timeout: Duration,
}

impl PodExecutor {
    pub fn new(client: K8sClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Run `command` in the first container of `pod`.
    ///
    /// The whole session, from opening the stream to the final status, is
    /// bounded by the executor timeout.
    pub async fn exec(&self, pod: &ReadyPod, command: &[String]) -> Result<ExecOutput, ExecError> {
        let target = format!("{}/{}", pod.namespace(), pod.name());
        debug!("Executing in {}: {:?}", target, command);

        let api: Api<Pod> = self.client.namespaced_api(pod.namespace());
        let session = run_session(&api, pod.name(), &target, command);

        let output = tokio::time::timeout(self.timeout, session)
            .await
            .map_err(|_| ExecError::Timeout {
                pod: target.clone(),
                timeout: self.timeout,
            })??;

        debug!(
            "Exec in {} finished (exit code: {:?})\nstdout: {}\nstderr: {}",
            target, output.exit_code, output.stdout, output.stderr
        );
        Ok(output)
    }
}

async fn run_session(
    api: &Api<Pod>,
    name: &str,
    target: &str,
    command: &[String],
) -> Result<ExecOutput, ExecError> {
    let params = AttachParams::default()
        .stdin(false)
        .stdout(true)
        .stderr(true)
        .tty(false);

    let mut attached = api
        .exec(name, command.to_vec(), &params)
        .await
        .map_err(|e| ExecError::Setup {
            pod: target.to_string(),
            message: e.to_string(),
        })?;

    let stdout = attached.stdout();
    let stderr = attached.stderr();
    let status = attached.take_status();

    let (stdout, stderr) = futures::try_join!(read_all(stdout), read_all(stderr)).map_err(|e| {
        ExecError::Stream {
            pod: target.to_string(),
            message: e.to_string(),
            stderr: String::new(),
        }
    })?;

    let status = match status {
        Some(status) => status.await,
        None => None,
    };

    attached.join().await.map_err(|e| ExecError::Stream {
        pod: target.to_string(),
        message: e.to_string(),
        stderr: stderr.clone(),
    })?;

    let exit_code = status.as_ref().and_then(exit_code);
    let status_message = status
        .filter(|s| s.status.as_deref() != Some("Success"))
        .and_then(|s| s.message);

    Ok(ExecOutput {
        stdout,
        stderr,
        exit_code,
        status_message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{StatusCause, StatusDetails};

    fn failure(reason: &str, causes: Vec<StatusCause>) -> Status {
        Status {
            status: Some("Failure".to_string()),
            reason: Some(reason.to_string()),
            message: Some("command terminated with non-zero exit code".to_string()),
            details: Some(StatusDetails {
                causes: Some(causes),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn cause(reason: &str, message: &str) -> StatusCause {
        StatusCause {
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_exit_code_success() {
        let status = Status {
            status: Some("Success".to_string()),
            ..Default::default()
        };
        assert_eq!(exit_code(&status), Some(0));
    }

    #[test]
    fn test_exit_code_from_cause() {
        let status = failure("NonZeroExitCode", vec![cause("ExitCode", "1")]);
        assert_eq!(exit_code(&status), Some(1));

        let status = failure(
            "NonZeroExitCode",
            vec![cause("Other", "x"), cause("ExitCode", "127")],
        );
        assert_eq!(exit_code(&status), Some(127));
    }

    #[test]
    fn test_exit_code_unknown() {
        let status = Status {
            status: Some("Failure".to_string()),
            message: Some("executable file not found in $PATH".to_string()),
            ..Default::default()
        };
        assert_eq!(exit_code(&status), None);

        let status = failure("NonZeroExitCode", vec![cause("ExitCode", "garbage")]);
        assert_eq!(exit_code(&status), None);
    }

    #[test]
    fn test_read_all() {
        let data: &[u8] = b"PING 10.42.0.7\n";
        let text = tokio_test::block_on(read_all(Some(data))).unwrap();
        assert_eq!(text, "PING 10.42.0.7\n");

        let empty = tokio_test::block_on(read_all(None::<&[u8]>)).unwrap();
        assert_eq!(empty, "");
    }

    #[test]
    fn test_exec_output_success() {
        let mut output = ExecOutput::default();
        assert!(!output.success());
        output.exit_code = Some(0);
        assert!(output.success());
    }
}
