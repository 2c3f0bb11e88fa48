//! Soil water model executed as an external program.
//!
//! The program receives a [`SimulationInput`] as JSON on stdin and must
//! print [`CalculationResults`] as JSON on stdout. A non-zero exit status is
//! an execution failure; its stderr is kept in the error message.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::domain::ports::{SoilWaterModel, SoilWaterModelError};
use crate::domain::{CalculationResults, SimulationInput};

const STDERR_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct CommandSoilWaterModel {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSoilWaterModel {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    async fn execute(&self, stdin: Vec<u8>) -> Result<Vec<u8>, SoilWaterModelError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|error| {
                SoilWaterModelError::unavailable(format!(
                    "cannot start {}: {error}",
                    self.program.display()
                ))
            })?;

        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(&stdin)
                .await
                .map_err(|error| SoilWaterModelError::execution(error.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|error| SoilWaterModelError::execution(error.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let preview: String = stderr.trim().chars().take(STDERR_PREVIEW_CHARS).collect();
            return Err(SoilWaterModelError::execution(format!(
                "{}: {preview}",
                output.status
            )));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl SoilWaterModel for CommandSoilWaterModel {
    async fn run(&self, input: &SimulationInput) -> Result<CalculationResults, SoilWaterModelError> {
        let stdin = serde_json::to_vec(input)
            .map_err(|error| SoilWaterModelError::execution(error.to_string()))?;
        debug!(field_id = %input.field_id, program = %self.program.display(), "invoking soil water model");
        let stdout = tokio::time::timeout(self.timeout, self.execute(stdin))
            .await
            .map_err(|_| {
                SoilWaterModelError::execution(format!(
                    "no result within {} s",
                    self.timeout.as_secs()
                ))
            })??;
        serde_json::from_slice(&stdout)
            .map_err(|error| SoilWaterModelError::invalid_output(error.to_string()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::field::fixtures::field;

    fn shell(script: &str) -> CommandSoilWaterModel {
        CommandSoilWaterModel::new(
            "/bin/sh",
            vec!["-c".to_owned(), script.to_owned()],
            Duration::from_secs(5),
        )
    }

    fn input() -> SimulationInput {
        SimulationInput::new(&field(), &[])
    }

    #[tokio::test]
    async fn decodes_results_from_stdout() {
        let model = shell(
            r#"cat > /dev/null; echo '{"raw": 30.5, "taw": 61.0, "forecastStartDate": "2024-07-03", "days": [], "computedAt": "2024-07-03T06:00:00Z"}'"#,
        );
        let results = model.run(&input()).await.expect("model runs");
        assert_eq!(results.raw, 30.5);
    }

    #[tokio::test]
    async fn non_zero_exit_is_execution_error() {
        let model = shell("cat > /dev/null; echo 'diverged' >&2; exit 3");
        let error = model.run(&input()).await.expect_err("fails");
        assert!(matches!(error, SoilWaterModelError::Execution { .. }));
        assert!(error.to_string().contains("diverged"));
    }

    #[tokio::test]
    async fn garbage_output_is_invalid_output() {
        let model = shell("cat > /dev/null; echo 'not json'");
        let error = model.run(&input()).await.expect_err("fails");
        assert!(matches!(error, SoilWaterModelError::InvalidOutput { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let model = CommandSoilWaterModel::new(
            "/nonexistent/soil-model",
            Vec::new(),
            Duration::from_secs(1),
        );
        let error = model.run(&input()).await.expect_err("fails");
        assert!(matches!(error, SoilWaterModelError::Unavailable { .. }));
    }
}
