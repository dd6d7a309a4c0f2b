//! Text generation backends.

use std::{
    io::ErrorKind,
    process::{Output, Stdio},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::debug;

use crate::{
    config::{MODEL_COMMAND_VAR, ModelSettings, PromptInput},
    error::{Result, SummaryWallError},
};

/// One synchronous request/response exchange with a language model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Runs an external program and hands it the prompt.
///
/// The prompt goes to the child's stdin unless [`PromptInput::Argument`] is
/// chosen, in which case it is appended as the last argument. The reply is
/// stdout, unless stdout contains a line starting with the output marker, in
/// which case the reply is read from the path after it.
#[derive(Debug, Clone)]
pub struct ProcessGenerator {
    program: String,
    args: Vec<String>,
    prompt_input: PromptInput,
    timeout: Duration,
    output_marker: String,
}

impl ProcessGenerator {
    /// `program` is taken verbatim, so paths containing spaces need no quoting.
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
        output_marker: impl Into<String>,
    ) -> Result<Self> {
        let program = program.into();
        if program.trim().is_empty() {
            return Err(SummaryWallError::missing_config(MODEL_COMMAND_VAR));
        }

        Ok(Self {
            program,
            args,
            prompt_input: PromptInput::default(),
            timeout,
            output_marker: output_marker.into(),
        })
    }

    pub fn from_settings(settings: &ModelSettings) -> Result<Self> {
        let program = settings
            .command
            .as_deref()
            .ok_or_else(|| SummaryWallError::missing_config(MODEL_COMMAND_VAR))?;
        Ok(Self::new(
            program,
            settings.args.clone(),
            settings.timeout,
            settings.output_marker.as_str(),
        )?
        .with_prompt_input(settings.prompt_input))
    }

    pub fn with_prompt_input(mut self, prompt_input: PromptInput) -> Self {
        self.prompt_input = prompt_input;
        self
    }

    fn output_path<'a>(&self, stdout: &'a str) -> Option<&'a str> {
        if self.output_marker.is_empty() {
            return None;
        }
        stdout
            .lines()
            .map(str::trim)
            .find_map(|line| line.strip_prefix(self.output_marker.as_str()))
            .map(str::trim)
            .filter(|path| !path.is_empty())
    }

    async fn run(&self, prompt: &str) -> Result<Output> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match self.prompt_input {
            PromptInput::Argument => {
                command.arg(prompt).stdin(Stdio::null());
                Ok(command.output().await?)
            }
            PromptInput::Stdin => {
                let mut child = command.stdin(Stdio::piped()).spawn()?;
                let stdin = child.stdin.take();
                // Fed while waiting: the child may fill stdout before reading stdin.
                let feed = async move {
                    if let Some(mut stdin) = stdin {
                        stdin.write_all(prompt.as_bytes()).await?;
                        stdin.shutdown().await?;
                    }
                    Ok::<_, std::io::Error>(())
                };
                let (fed, output) = tokio::join!(feed, child.wait_with_output());
                let output = output?;
                if let Err(e) = fed {
                    // A child may exit without reading its input.
                    if e.kind() != ErrorKind::BrokenPipe {
                        return Err(e.into());
                    }
                    debug!(program = %self.program, "Model process closed stdin early");
                }
                Ok(output)
            }
        }
    }
}

#[async_trait]
impl TextGenerator for ProcessGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            program = %self.program,
            prompt_input = ?self.prompt_input,
            prompt_chars = prompt.chars().count(),
            "Invoking model process"
        );

        let output = tokio::time::timeout(self.timeout, self.run(prompt))
            .await
            .map_err(|_| SummaryWallError::ModelTimedOut {
                seconds: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            return Err(SummaryWallError::model_failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reply = match self.output_path(&stdout) {
            Some(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                SummaryWallError::model_failed(format!("cannot read model output {path}: {e}"))
            })?,
            None => stdout.to_string(),
        };

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(SummaryWallError::model_failed("model returned an empty reply"));
        }
        Ok(reply.to_string())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::prompt::build_prompt;

    const MARKER: &str = "已輸出到:";

    fn generator(program: &str, args: &[&str]) -> ProcessGenerator {
        let args = args.iter().map(|a| a.to_string()).collect();
        ProcessGenerator::new(program, args, Duration::from_secs(10), MARKER).unwrap()
    }

    #[tokio::test]
    async fn test_stdout_is_the_reply() {
        let reply = generator("cat", &[]).generate("重點整理").await.unwrap();
        assert_eq!(reply, "重點整理");
    }

    #[tokio::test]
    async fn test_long_cjk_prompt_goes_through_stdin() {
        let prompt = build_prompt("長影片", &"字".repeat(70_000));
        assert!(prompt.len() > 128 * 1024);

        let reply = generator("cat", &[]).generate(&prompt).await.unwrap();
        assert_eq!(reply, prompt.trim());
    }

    #[tokio::test]
    async fn test_prompt_as_last_argument() {
        let reply = generator("echo", &[])
            .with_prompt_input(PromptInput::Argument)
            .generate("重點整理")
            .await
            .unwrap();
        assert_eq!(reply, "重點整理");
    }

    #[tokio::test]
    async fn test_child_ignoring_stdin_still_replies() {
        let prompt = "字".repeat(100_000);
        let reply = generator("echo", &["done"]).generate(&prompt).await.unwrap();
        assert_eq!(reply, "done");
    }

    #[tokio::test]
    async fn test_arguments_with_spaces_are_kept_whole() {
        let dir = tempfile::tempdir().unwrap();
        let bot_dir = dir.path().join("model bot");
        std::fs::create_dir(&bot_dir).unwrap();
        let script = bot_dir.join("reply.sh");
        std::fs::write(&script, "printf '%s|' \"$1\"\ncat\n").unwrap();

        let reply = generator("sh", &[script.to_str().unwrap(), "two words"])
            .generate("prompt")
            .await
            .unwrap();
        assert_eq!(reply, "two words|prompt");
    }

    #[tokio::test]
    async fn test_reply_read_from_marked_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reply.txt");
        let script = dir.path().join("bot.sh");
        std::fs::write(
            &script,
            format!(
                "cat > '{out}'\necho 'working...'\necho '{MARKER} {out}'\n",
                out = out.display()
            ),
        )
        .unwrap();

        let reply = generator("sh", &[script.to_str().unwrap()])
            .generate("from file")
            .await
            .unwrap();
        assert_eq!(reply, "from file");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_an_error() {
        let err = generator("false", &[]).generate("x").await.unwrap_err();
        assert!(matches!(err, SummaryWallError::ModelFailed { .. }));
    }

    #[tokio::test]
    async fn test_empty_output_is_an_error() {
        let err = generator("true", &[]).generate("x").await.unwrap_err();
        assert!(matches!(err, SummaryWallError::ModelFailed { .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let generator = ProcessGenerator::new(
            "sleep",
            vec!["5".to_string()],
            Duration::from_millis(100),
            MARKER,
        )
        .unwrap();
        let err = generator.generate("x").await.unwrap_err();
        assert!(matches!(err, SummaryWallError::ModelTimedOut { .. }));
    }

    #[test]
    fn test_blank_command_is_rejected() {
        assert!(ProcessGenerator::new("   ", Vec::new(), Duration::from_secs(1), MARKER).is_err());
    }

    #[test]
    fn test_from_settings_requires_command() {
        assert!(matches!(
            ProcessGenerator::from_settings(&ModelSettings::default()),
            Err(SummaryWallError::MissingConfig { .. })
        ));
    }
}
