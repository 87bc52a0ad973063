//! Result type alias for conftree

use super::errors::ConfError;

/// Result type alias for conftree operations
///
/// # Examples
///
/// ```
/// use conftree::domain::result::Result;
/// use conftree::domain::errors::ConfError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(ConfError::Configuration("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ConfError>;
