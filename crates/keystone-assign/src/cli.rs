//! `openstack` command line runner.
//!
//! Implements [`Invoke`] by spawning the `openstack` client. Credentials come
//! from the inherited `OS_*` environment. List calls request JSON output and
//! parse it into [`Record`]s; failures are classified from the client's error
//! output and transient ones are retried.

use std::process::Command;

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::command::{command_line, Action, CommandError, CommandErrorKind, Invoke, Record, ResourceKind};
use crate::config::CliConfig;
use crate::retry::{with_retry_if, RetryConfig};

const NOT_FOUND_MARKERS: &[&str] = &["could not be found", "No such", "No role", "HTTP 404"];

const TRANSIENT_MARKERS: &[&str] = &[
    "Unable to establish connection",
    "Service Unavailable",
    "HTTP 503",
    "HTTP 502",
    "HTTP 504",
    "timed out",
    "Connection reset",
];

/// Runs identity service commands through the `openstack` client.
#[derive(Debug, Clone)]
pub struct OpenstackCli {
    /// Program to execute.
    program: String,

    /// Retry policy for transient failures.
    retry: RetryConfig,
}

impl OpenstackCli {
    /// Create a runner for `program` with the given retry policy.
    pub fn new(program: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            program: program.into(),
            retry,
        }
    }

    /// Create a runner from configuration.
    pub fn from_config(config: &CliConfig) -> Self {
        Self::new(config.program.clone(), config.retry())
    }

    /// Program this runner executes.
    pub fn program(&self) -> &str {
        &self.program
    }

    fn run_once(
        &self,
        resource: ResourceKind,
        action: Action,
        args: &[String],
        line: &str,
    ) -> Result<Vec<Record>, CommandError> {
        let mut command = Command::new(&self.program);
        command.args(resource.words()).arg(action.as_str()).args(args);
        if action == Action::List {
            command.args(["-f", "json"]);
        }

        let output = command
            .output()
            .map_err(|e| CommandError::new(CommandErrorKind::Spawn, line, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            return Err(CommandError::new(classify(&message), line, message));
        }

        if action == Action::List {
            parse_records(&output.stdout).map_err(|message| {
                CommandError::new(CommandErrorKind::Parse, line, message)
            })
        } else {
            Ok(Vec::new())
        }
    }
}

impl Default for OpenstackCli {
    fn default() -> Self {
        Self::from_config(&CliConfig::default())
    }
}

impl Invoke for OpenstackCli {
    #[instrument(skip(self, args), fields(program = %self.program))]
    fn invoke(
        &self,
        resource: ResourceKind,
        action: Action,
        args: &[String],
    ) -> Result<Vec<Record>, CommandError> {
        let line = command_line(&self.program, resource, action, args);
        debug!(command = %line, "Running identity command");

        let result = with_retry_if(
            &self.retry,
            || self.run_once(resource, action, args, &line),
            CommandError::is_transient,
        );

        if let Err(ref err) = result {
            warn!(command = %line, kind = %err.kind, "Identity command failed");
        }
        result
    }
}

/// Classify a failure from the client's error output.
pub fn classify(stderr: &str) -> CommandErrorKind {
    if TRANSIENT_MARKERS.iter().any(|m| stderr.contains(m)) {
        CommandErrorKind::Transient
    } else if NOT_FOUND_MARKERS.iter().any(|m| stderr.contains(m)) {
        CommandErrorKind::NotFound
    } else {
        CommandErrorKind::Failed
    }
}

/// Parse `-f json` list output: an array of flat objects.
///
/// Strings are taken as-is, `null` becomes an empty value, and anything else
/// keeps its JSON rendering. Blank output means no records.
pub fn parse_records(stdout: &[u8]) -> Result<Vec<Record>, String> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let rows: Vec<Map<String, Value>> =
        serde_json::from_slice(stdout).map_err(|e| format!("invalid JSON output: {}", e))?;

    Ok(rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s,
                        Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (key, value)
                })
                .collect::<Record>()
        })
        .collect())
}
