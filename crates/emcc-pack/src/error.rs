use std::io;
use std::path::PathBuf;
use std::process::{ExitCode, ExitStatus};

/// Failure classes of one packaging run. Every class is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    ExternalTool,
    Filesystem,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::ExternalTool => "external_tool",
            ErrorKind::Filesystem => "filesystem",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("{0}")]
    Config(String),

    #[error("{}: {detail}", .path.display())]
    Project { path: PathBuf, detail: String },

    #[error("{tool} exited with {status}")]
    ToolFailed { tool: String, status: ExitStatus },

    #[error("failed to spawn {tool}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{action}: {}", .path.display())]
    Fs {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PackError {
    pub(crate) fn fs(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        PackError::Fs {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PackError::Config(_) | PackError::Project { .. } => ErrorKind::Configuration,
            PackError::ToolFailed { .. } | PackError::Spawn { .. } => ErrorKind::ExternalTool,
            PackError::Fs { .. } => ErrorKind::Filesystem,
        }
    }

    /// Process exit code for this failure. A failed tool's status is passed through.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            PackError::ToolFailed { status, .. } => exit_code_from_status(status),
            PackError::Spawn { .. } => ExitCode::from(127),
            PackError::Config(_) | PackError::Project { .. } => ExitCode::from(2),
            PackError::Fs { .. } => ExitCode::from(1),
        }
    }
}

pub fn exit_code_from_status(status: &ExitStatus) -> ExitCode {
    let code = status.code().unwrap_or(1);
    if !(1..=255).contains(&code) {
        return ExitCode::from(1);
    }
    ExitCode::from(code as u8)
}

pub type Result<T> = std::result::Result<T, PackError>;
