use crashstore_types::TypeError;

/// Errors raised by a [`BlobConnection`](crate::BlobConnection).
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// No object is stored under the key.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// The key cannot be represented by this backend.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend refused or could not complete the operation.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Errors from crash storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The crash id is too short to derive its storage keys.
    #[error(transparent)]
    MalformedIdentifier(TypeError),

    /// The requested object does not exist.
    #[error("not found: {key}")]
    NotFound { key: String },

    /// Any other failure reported by the connection, surfaced unchanged.
    #[error("connection error: {0}")]
    Connection(ConnectionError),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A dump name would escape or collide with another key family.
    #[error("invalid dump name {name:?}: {reason}")]
    InvalidDumpName { name: String, reason: String },

    /// Two dump names in one set map to the same stored object.
    #[error("dump names {first:?} and {second:?} share the slot {slot:?}")]
    ConflictingDumpNames {
        first: String,
        second: String,
        slot: String,
    },

    /// Configuration could not be read or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A background task failed to run to completion.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ConnectionError> for StoreError {
    fn from(e: ConnectionError) -> Self {
        match e {
            ConnectionError::NotFound { key } => Self::NotFound { key },
            other => Self::Connection(other),
        }
    }
}

impl From<TypeError> for StoreError {
    fn from(e: TypeError) -> Self {
        match e {
            TypeError::Serialization(msg) => Self::Serialization(msg),
            malformed @ TypeError::MalformedIdentifier { .. } => Self::MalformedIdentifier(malformed),
        }
    }
}

impl StoreError {
    /// `true` when the error means "never saved" rather than "unhealthy".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
