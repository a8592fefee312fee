/// Error code registry for docbatch
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 3000-3099: Store setup errors
/// - 3100-3199: Scan errors
/// - 3200-3299: Commit errors
/// - 4000-4999: Checkpoint errors
/// - 5000-5999: Run lifecycle errors
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_PARSE_ERROR: u16 = 1007;
    pub const CONFIG_VALIDATION_FAILED: u16 = 1008;

    // Store setup errors (3000-3099)
    pub const SETUP_UNREACHABLE: u16 = 3001;
    pub const SETUP_PERMISSION_DENIED: u16 = 3002;
    pub const SETUP_INVALID: u16 = 3003;

    // Scan errors (3100-3199)
    pub const SCAN_FAILED: u16 = 3100;
    pub const SCAN_TIMEOUT: u16 = 3101;
    pub const SCAN_PERMISSION_DENIED: u16 = 3102;

    // Commit errors (3200-3299)
    pub const COMMIT_FAILED: u16 = 3200;
    pub const COMMIT_TIMEOUT: u16 = 3201;
    pub const COMMIT_REJECTED: u16 = 3202;
    pub const COMMIT_PERMISSION_DENIED: u16 = 3203;

    // Checkpoint errors (4000-4999)
    pub const CHECKPOINT_GENERIC: u16 = 4000;
    pub const CHECKPOINT_IO_ERROR: u16 = 4001;
    pub const CHECKPOINT_CORRUPTED: u16 = 4002;
    pub const CHECKPOINT_MISMATCH: u16 = 4003;

    // Run lifecycle errors (5000-5999)
    pub const RUN_CANCELLED: u16 = 5001;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1007 => "Failed to parse configuration",
        1008 => "Configuration validation failed",

        3001 => "Document store is unreachable",
        3002 => "Not authorized to access the document store",
        3003 => "Document store is misconfigured",

        3100 => "Fetching a page of documents failed",
        3101 => "Fetching a page of documents timed out",
        3102 => "Not authorized to read the collection",

        3200 => "Committing a batch failed",
        3201 => "Committing a batch timed out",
        3202 => "The store rejected the batch",
        3203 => "Not authorized to write the collection",

        4000 => "Generic checkpoint error",
        4001 => "Checkpoint file could not be read or written",
        4002 => "Checkpoint file is corrupted",
        4003 => "Checkpoint belongs to a different job",

        5001 => "Run was cancelled by a shutdown signal",

        _ => "Unknown error code",
    }
}
