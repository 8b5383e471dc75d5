use std::fmt;

/// Machine-readable error codes surfaced alongside container errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    Transport,
    PreconditionFailed,
    SaveMismatch,
    IncompatibleTimezone,
    MissingLookup,
    InvalidDatetime,
    RecordNotFound,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::PreconditionFailed => "E2001",
            Self::MissingLookup => "E2002",
            Self::RecordNotFound => "E2003",
            Self::SaveMismatch => "E3001",
            Self::IncompatibleTimezone => "E4001",
            Self::InvalidDatetime => "E4002",
            Self::Transport => "E5001",
        }
    }

    /// Short human-facing summary for logs and notices.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::Transport => "Record API request failed",
            Self::PreconditionFailed => "Operation invoked out of order",
            Self::SaveMismatch => "Save acknowledgement mismatch",
            Self::IncompatibleTimezone => "Incompatible timezones",
            Self::MissingLookup => "List view not selected",
            Self::InvalidDatetime => "Invalid datetime value",
            Self::RecordNotFound => "Record not loaded",
        }
    }

    /// Optional remediation hint for the UI layer.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in the recsync config file and retry."),
            Self::Transport => Some("Check connectivity and retry the action."),
            Self::PreconditionFailed => Some("Select a list view before paging."),
            Self::SaveMismatch => Some("Reload the record; the server saved a different one."),
            Self::IncompatibleTimezone => {
                Some("Pick the date and the time in the same timezone.")
            }
            Self::MissingLookup => Some("Select a list view before applying filters."),
            Self::InvalidDatetime => None,
            Self::RecordNotFound => Some("Refresh the record list and retry."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Opaque failure reported by the record API client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    /// HTTP status when the failure came from a response.
    pub status: Option<u16>,
    /// Server or transport supplied message.
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// Every failure a container can record in its error list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Precondition(String),

    #[error("save acknowledged {acknowledged:?}, expected {expected}")]
    SaveMismatch {
        expected: String,
        acknowledged: Vec<String>,
    },

    #[error("cannot merge a date in {date_zone} with a time in {time_zone}")]
    IncompatibleTimezone {
        date_zone: String,
        time_zone: String,
    },

    #[error("no list view selected for {0}")]
    MissingLookup(String),

    #[error("invalid datetime '{0}'")]
    InvalidDatetime(String),

    #[error("record {0} is not loaded")]
    RecordNotFound(String),
}

impl SyncError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Transport(_) => ErrorCode::Transport,
            Self::Precondition(_) => ErrorCode::PreconditionFailed,
            Self::SaveMismatch { .. } => ErrorCode::SaveMismatch,
            Self::IncompatibleTimezone { .. } => ErrorCode::IncompatibleTimezone,
            Self::MissingLookup(_) => ErrorCode::MissingLookup,
            Self::InvalidDatetime(_) => ErrorCode::InvalidDatetime,
            Self::RecordNotFound(_) => ErrorCode::RecordNotFound,
        }
    }

    /// Optional remediation hint for the UI layer.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
