//! Result type alias for gzpipe operations

use crate::Error;

/// Result type alias for gzpipe operations
pub type Result<T> = std::result::Result<T, Error>;
