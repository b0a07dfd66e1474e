use std::process::ExitCode;

/// Startup configuration problems. Never raised once polling has begun.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),

    #[error("failed to read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures talking to the chain data source.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned HTTP {0}")]
    Status(u16),

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected response: {0}")]
    Unexpected(String),

    #[error("chain source unavailable: {0}")]
    Unavailable(String),
}

impl RpcError {
    /// Transient errors are retried on the next tick; the rest indicate a bad
    /// endpoint or credentials.
    pub fn is_transient(&self) -> bool {
        match self {
            RpcError::Http(e) => !e.is_builder(),
            RpcError::Status(code) => !matches!(code, 401 | 403 | 404),
            RpcError::Rpc { .. } | RpcError::Unexpected(_) | RpcError::Unavailable(_) => true,
        }
    }
}

/// Conditions that stop the process. Everything else is contained in a tick.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("chain source unreachable: {0}")]
    Connectivity(#[source] RpcError),

    #[error(transparent)]
    Startup(#[from] anyhow::Error),
}

impl FatalError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            FatalError::Config(_) => ExitCode::from(2),
            FatalError::Connectivity(_) => ExitCode::from(3),
            FatalError::Startup(_) => ExitCode::FAILURE,
        }
    }
}
