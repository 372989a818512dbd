//! Host-side execution of bridge commands.
//!
//! Configuration maps a command name to a command line; the page may only
//! invoke names present in the table. `echo` is a builtin that never
//! spawns a process and shadows any configured entry.

use std::collections::HashMap;

use thiserror::Error;
use tokio::process::Command;

pub const ECHO_COMMAND: &str = "echo";

#[derive(Debug, Error)]
pub enum HostError {
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("command {0:?} has an empty command line")]
    EmptyCommand(String),
    #[error("failed to spawn {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("command {name:?} exited with {status}: {stderr}")]
    Failed {
        name: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Named host commands the page is allowed to invoke.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: HashMap<String, Vec<String>>,
}

impl CommandTable {
    /// Builds the table from configuration, splitting each command line on
    /// whitespace into an argv.
    pub fn from_config(config: &HashMap<String, String>) -> Result<Self, HostError> {
        let mut commands = HashMap::new();
        for (name, line) in config {
            let argv: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if argv.is_empty() {
                return Err(HostError::EmptyCommand(name.clone()));
            }
            commands.insert(name.clone(), argv);
        }
        Ok(Self { commands })
    }

    pub fn contains(&self, name: &str) -> bool {
        name == ECHO_COMMAND || self.commands.contains_key(name)
    }

    /// Runs one named command and returns its stdout with the trailing
    /// newline trimmed. Request args are appended to the configured argv.
    pub async fn run(&self, name: &str, args: &[String]) -> Result<String, HostError> {
        if name == ECHO_COMMAND {
            return Ok(args.join(" "));
        }

        let argv = self
            .commands
            .get(name)
            .ok_or_else(|| HostError::UnknownCommand(name.to_string()))?;

        tracing::debug!(command = name, program = %argv[0], "spawning host command");
        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .args(args)
            .output()
            .await
            .map_err(|source| HostError::Spawn {
                program: argv[0].clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(HostError::Failed {
                name: name.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim_end_matches(&['\r', '\n'][..]).to_string())
    }
}
