//! Running command pipelines for command fields
//!
//! A command field only assembles its stages (program plus arguments, one
//! vector per stage). Executing them is delegated to a [`PipelineRunner`] so
//! hosts can swap in their own execution policy.

use duct::Expression;

use crate::error::{FieldError, Result};

/// Executes assembled pipeline stages and returns the last stage's output
pub trait PipelineRunner: Send + Sync + std::fmt::Debug {
    fn run(&self, stages: &[Vec<String>]) -> Result<String>;
}

/// Pipes the stages together with `duct`
#[derive(Debug, Clone, Copy, Default)]
pub struct DuctRunner;

impl PipelineRunner for DuctRunner {
    fn run(&self, stages: &[Vec<String>]) -> Result<String> {
        let command = describe(stages);
        let mut pipeline: Option<Expression> = None;

        for stage in stages {
            let (program, args) = stage.split_first().ok_or_else(|| FieldError::Command {
                command: command.clone(),
                message: "Empty stage".to_string(),
            })?;
            let next = duct::cmd(program.as_str(), args.iter());
            pipeline = Some(match pipeline {
                None => next,
                Some(previous) => previous.pipe(next),
            });
        }

        let pipeline = pipeline.ok_or_else(|| FieldError::Command {
            command: command.clone(),
            message: "Empty command".to_string(),
        })?;

        tracing::trace!(command = %command, "Running pipeline");

        // read() trims the trailing newline and fails on non-zero exit
        pipeline.read().map_err(|e| FieldError::Command {
            command,
            message: e.to_string(),
        })
    }
}

/// Shell-like rendering of stages for messages
pub fn describe(stages: &[Vec<String>]) -> String {
    stages
        .iter()
        .map(|stage| stage.join(" "))
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stages(list: &[&[&str]]) -> Vec<Vec<String>> {
        list.iter()
            .map(|stage| stage.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&stages(&[&["ls", "-l"], &["wc"]])), "ls -l | wc");
    }

    #[test]
    fn test_empty_pipeline_fails() {
        assert!(DuctRunner.run(&[]).is_err());
        assert!(DuctRunner.run(&stages(&[&[]])).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_piped_stages() {
        let out = DuctRunner
            .run(&stages(&[&["echo", "hello world"], &["tr", "a-z", "A-Z"]]))
            .unwrap();
        assert_eq!(out, "HELLO WORLD");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_stage_is_command_error() {
        let err = DuctRunner.run(&stages(&[&["false"]])).unwrap_err();
        assert!(matches!(err, FieldError::Command { .. }));
    }
}
