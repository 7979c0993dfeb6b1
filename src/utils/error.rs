use thiserror::Error;

/// Failure of the authentication probe.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("credentials were rejected by {url}")]
    Rejected { url: String },

    #[error("authentication probe to {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

/// Failure of a single GET through the client.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("'{name}' cannot be used as an output file name")]
    InvalidName { name: String },

    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("discovery aborted at {url}: {source}")]
    Upstream {
        url: String,
        #[source]
        source: FetchError,
    },
}

/// Per-leaf failure recorded by the dispatcher.
#[derive(Error, Debug)]
pub enum LeafError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("download worker stopped before this job finished")]
    Aborted,
}

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Storage error: {0}")]
    Persist(#[from] PersistError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    Network,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl MirrorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MirrorError::Auth(_) => ErrorCategory::Authentication,
            MirrorError::Discovery(_) => ErrorCategory::Network,
            MirrorError::Persist(_) | MirrorError::Io(_) | MirrorError::Serialization(_) => {
                ErrorCategory::Storage
            }
            MirrorError::Config { .. }
            | MirrorError::InvalidConfigValue { .. }
            | MirrorError::MissingConfig { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            MirrorError::Auth(AuthError::Rejected { .. }) => ErrorSeverity::Critical,
            MirrorError::Auth(AuthError::Transport { .. }) | MirrorError::Discovery(_) => {
                ErrorSeverity::Medium
            }
            MirrorError::Config { .. }
            | MirrorError::InvalidConfigValue { .. }
            | MirrorError::MissingConfig { .. } => ErrorSeverity::High,
            MirrorError::Persist(_) | MirrorError::Io(_) | MirrorError::Serialization(_) => {
                ErrorSeverity::High
            }
        }
    }

    /// Process exit status for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 2,
            ErrorCategory::Authentication => match self {
                MirrorError::Auth(AuthError::Rejected { .. }) => 3,
                _ => 4,
            },
            ErrorCategory::Network => 4,
            ErrorCategory::Storage => 1,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            MirrorError::Auth(AuthError::Rejected { .. }) => {
                "The server rejected the supplied username/API token.".to_string()
            }
            MirrorError::Auth(AuthError::Transport { url, .. }) => {
                format!("Could not reach {} to authenticate.", url)
            }
            MirrorError::Discovery(DiscoveryError::Upstream { url, .. }) => {
                format!("Job discovery stopped at {}; nothing was downloaded.", url)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            MirrorError::Auth(AuthError::Rejected { .. }) => {
                "Check the username and regenerate the API token."
            }
            MirrorError::Auth(AuthError::Transport { .. }) | MirrorError::Discovery(_) => {
                "Check connectivity to the server and re-run; finished files are kept."
            }
            MirrorError::Config { .. }
            | MirrorError::InvalidConfigValue { .. }
            | MirrorError::MissingConfig { .. } => "Fix the configuration and try again.",
            MirrorError::Persist(_) | MirrorError::Io(_) | MirrorError::Serialization(_) => {
                "Check that the output directory is writable and has free space."
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
