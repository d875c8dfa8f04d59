//! Face encoder backed by an external program.
//!
//! The program is invoked as `<program> [args..] <image_path>` and must print
//! JSON on stdout, either `{"descriptors": [[..], ..]}` or a bare array of
//! arrays, one entry per detected face in detector order. An empty list
//! means no face.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;

use super::{EncoderError, FaceEncoder};
use crate::descriptor::FaceDescriptor;
use crate::subprocess::run_command;

/// Longest stderr excerpt carried in [`EncoderError::Failed`].
const STDERR_EXCERPT_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct CommandEncoder {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EncoderOutput {
    Wrapped { descriptors: Vec<Vec<f64>> },
    Bare(Vec<Vec<f64>>),
}

impl CommandEncoder {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

impl FaceEncoder for CommandEncoder {
    async fn encode(&self, image_path: &Path) -> Result<Option<FaceDescriptor>, EncoderError> {
        if !image_path.exists() {
            return Err(EncoderError::ImageNotFound(
                image_path.to_string_lossy().to_string(),
            ));
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(image_path);

        let output = run_command(&mut cmd, self.timeout).await?;
        if !output.success() {
            return Err(EncoderError::Failed {
                exit_code: output.exit_code,
                stderr: output.stderr.chars().take(STDERR_EXCERPT_CHARS).collect(),
            });
        }

        tracing::trace!(
            image = %image_path.display(),
            duration_ms = output.duration_ms,
            "Encoder process finished",
        );
        parse_encoder_output(&output.stdout)
    }
}

/// Parse encoder stdout and keep the first descriptor.
pub fn parse_encoder_output(stdout: &str) -> Result<Option<FaceDescriptor>, EncoderError> {
    let parsed: EncoderOutput = serde_json::from_str(stdout.trim()).map_err(|e| {
        let excerpt: String = stdout.chars().take(200).collect();
        EncoderError::Output(format!("{e}: {excerpt}"))
    })?;

    let descriptors = match parsed {
        EncoderOutput::Wrapped { descriptors } => descriptors,
        EncoderOutput::Bare(descriptors) => descriptors,
    };

    match descriptors.into_iter().next() {
        Some(first) => Ok(Some(FaceDescriptor::new(first)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn cat_encoder() -> CommandEncoder {
        CommandEncoder::new(
            "sh",
            vec!["-c".into(), r#"cat "$1""#.into(), "encoder".into()],
            Duration::from_secs(10),
        )
    }

    #[test]
    fn test_parse_wrapped_takes_first_face() {
        let d = parse_encoder_output(r#"{"descriptors": [[0.1, 0.2], [0.9, 0.9]]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(d.as_slice(), &[0.1, 0.2]);
    }

    #[test]
    fn test_parse_bare_array() {
        let d = parse_encoder_output("[[1.0, 2.0, 3.0]]\n").unwrap().unwrap();
        assert_eq!(d.dimension(), 3);
    }

    #[test]
    fn test_parse_empty_list_is_no_face() {
        assert!(parse_encoder_output(r#"{"descriptors": []}"#).unwrap().is_none());
        assert!(parse_encoder_output("[]").unwrap().is_none());
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert_matches!(parse_encoder_output("no faces here"), Err(EncoderError::Output(_)));
    }

    #[test]
    fn test_parse_empty_descriptor_is_error() {
        assert_matches!(
            parse_encoder_output(r#"{"descriptors": [[]]}"#),
            Err(EncoderError::Descriptor(_))
        );
    }

    #[tokio::test]
    async fn test_encode_passes_image_path_as_last_argument() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("face.json");
        std::fs::write(&image, r#"{"descriptors": [[0.25, 0.5]]}"#).unwrap();

        let d = cat_encoder().encode(&image).await.unwrap().unwrap();

        assert_eq!(d.as_slice(), &[0.25, 0.5]);
    }

    #[tokio::test]
    async fn test_encode_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let result = cat_encoder().encode(&dir.path().join("nope.jpg")).await;
        assert_matches!(result, Err(EncoderError::ImageNotFound(_)));
    }

    #[tokio::test]
    async fn test_encode_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("face.jpg");
        std::fs::write(&image, b"x").unwrap();
        let encoder = CommandEncoder::new(
            "sh",
            vec!["-c".into(), "echo broken >&2; exit 2".into(), "encoder".into()],
            Duration::from_secs(10),
        );

        let result = encoder.encode(&image).await;

        assert_matches!(result, Err(EncoderError::Failed { exit_code: 2, stderr }) if stderr.contains("broken"));
    }
}
