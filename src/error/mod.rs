use thiserror::Error;

use crate::store::StoreError;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// Result type for batch runs
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors that end a batch run
///
/// Every variant carries a numeric code from [`ErrorCode`]; the rendered
/// message starts with `[E<code>]` so operators can look it up.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config { code: u16, message: String },

    #[error("[E{code:04}] Cannot use {backend} store: {source}")]
    Setup {
        code: u16,
        backend: String,
        #[source]
        source: StoreError,
    },

    #[error("[E{code:04}] Scanning '{collection}' failed at page {page}: {source}")]
    Scan {
        code: u16,
        collection: String,
        page: usize,
        #[source]
        source: StoreError,
    },

    #[error("[E{code:04}] Commit of batch {batch} ({size} operations) failed: {source}")]
    Commit {
        code: u16,
        batch: usize,
        size: usize,
        #[source]
        source: StoreError,
    },

    #[error("[E{code:04}] Checkpoint error: {message}")]
    Checkpoint {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Run cancelled {stage}")]
    Cancelled { code: u16, stage: String },
}

impl BatchError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_VALIDATION_FAILED,
            message: message.into(),
        }
    }

    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
        }
    }

    pub fn setup(backend: impl Into<String>, source: StoreError) -> Self {
        let code = match &source {
            StoreError::PermissionDenied(_) => ErrorCode::SETUP_PERMISSION_DENIED,
            StoreError::InvalidArgument(_) | StoreError::NotFound(_) => ErrorCode::SETUP_INVALID,
            _ => ErrorCode::SETUP_UNREACHABLE,
        };
        Self::Setup {
            code,
            backend: backend.into(),
            source,
        }
    }

    pub fn scan(collection: impl Into<String>, page: usize, source: StoreError) -> Self {
        let code = match &source {
            StoreError::Timeout(_) => ErrorCode::SCAN_TIMEOUT,
            StoreError::PermissionDenied(_) => ErrorCode::SCAN_PERMISSION_DENIED,
            _ => ErrorCode::SCAN_FAILED,
        };
        Self::Scan {
            code,
            collection: collection.into(),
            page,
            source,
        }
    }

    pub fn commit(batch: usize, size: usize, source: StoreError) -> Self {
        let code = match &source {
            StoreError::Timeout(_) => ErrorCode::COMMIT_TIMEOUT,
            StoreError::PermissionDenied(_) => ErrorCode::COMMIT_PERMISSION_DENIED,
            StoreError::InvalidArgument(_)
            | StoreError::NotFound(_)
            | StoreError::Conflict(_) => ErrorCode::COMMIT_REJECTED,
            _ => ErrorCode::COMMIT_FAILED,
        };
        Self::Commit {
            code,
            batch,
            size,
            source,
        }
    }

    pub fn checkpoint(code: u16, message: impl Into<String>) -> Self {
        Self::Checkpoint {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn checkpoint_with_source(
        code: u16,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Checkpoint {
            code,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn cancelled(stage: impl Into<String>) -> Self {
        Self::Cancelled {
            code: ErrorCode::RUN_CANCELLED,
            stage: stage.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Setup { code, .. }
            | Self::Scan { code, .. }
            | Self::Commit { code, .. }
            | Self::Checkpoint { code, .. }
            | Self::Cancelled { code, .. } => *code,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Process exit code for this error (130 mirrors SIGINT)
    pub fn exit_code(&self) -> i32 {
        if self.is_cancelled() {
            130
        } else {
            1
        }
    }

    /// Longer explanation for the operator
    pub fn describe(&self) -> String {
        format!("{} (E{:04})", describe_error_code(self.code()), self.code())
    }
}
