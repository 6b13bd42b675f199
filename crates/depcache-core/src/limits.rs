//! Format limits and input validation
//!
//! The persisted cache stores every count and string length as a `u16`, so
//! anything handed to the codec has to fit in 65 535 per level.

/// Maximum number of entries at any level of the cache format (nodes,
/// resolver datas per node, dependencies per resolver, segments per path)
pub const MAX_COUNT_PER_LEVEL: usize = u16::MAX as usize;

/// Maximum encoded length of a single string, in UTF-8 bytes
pub const MAX_STRING_BYTES: usize = u16::MAX as usize;

/// Maximum traversal depth a configuration may request (in path segments)
pub const MAX_TRAVERSAL_DEPTH: usize = 1024;

/// Default traversal depth (in path segments)
pub const DEFAULT_TRAVERSAL_DEPTH: usize = 64;

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyAssetId,
    StringTooLong { what: &'static str, len: usize, max: usize },
    TooManyEntries { what: &'static str, count: usize, max: usize },
    TraversalDepthTooLarge { depth: usize, max: usize },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyAssetId => write!(f, "Asset id cannot be empty"),
            Self::StringTooLong { what, len, max } => {
                write!(f, "{} too long: {} bytes (max {})", what, len, max)
            }
            Self::TooManyEntries { what, count, max } => {
                write!(f, "Too many {}: {} (max {})", what, count, max)
            }
            Self::TraversalDepthTooLarge { depth, max } => {
                write!(f, "Traversal depth too large: {} (max {})", depth, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate an asset id
pub fn validate_asset_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::EmptyAssetId);
    }
    validate_string("asset id", id)
}

/// Validate that a string fits in a length-prefixed cache field
pub fn validate_string(what: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.len() > MAX_STRING_BYTES {
        return Err(ValidationError::StringTooLong {
            what,
            len: value.len(),
            max: MAX_STRING_BYTES,
        });
    }
    Ok(())
}

/// Validate that a collection fits in a `u16` count prefix
pub fn validate_count(what: &'static str, count: usize) -> Result<(), ValidationError> {
    if count > MAX_COUNT_PER_LEVEL {
        return Err(ValidationError::TooManyEntries {
            what,
            count,
            max: MAX_COUNT_PER_LEVEL,
        });
    }
    Ok(())
}

/// Validate traversal depth
pub fn validate_traversal_depth(depth: usize) -> Result<(), ValidationError> {
    if depth > MAX_TRAVERSAL_DEPTH {
        return Err(ValidationError::TraversalDepthTooLarge {
            depth,
            max: MAX_TRAVERSAL_DEPTH,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_asset_id() {
        assert!(validate_asset_id("a1b2c3").is_ok());
        assert_eq!(validate_asset_id(""), Err(ValidationError::EmptyAssetId));
        assert!(validate_asset_id(&"x".repeat(70_000)).is_err());
    }

    #[test]
    fn test_validate_count() {
        assert!(validate_count("nodes", 0).is_ok());
        assert!(validate_count("nodes", u16::MAX as usize).is_ok());
        assert!(matches!(
            validate_count("nodes", u16::MAX as usize + 1),
            Err(ValidationError::TooManyEntries { count: 65_536, .. })
        ));
    }

    #[test]
    fn test_validate_string_counts_bytes() {
        // 3 bytes per char in UTF-8
        let s = "語".repeat(21_846);
        assert_eq!(s.len(), 65_538);
        assert!(validate_string("segment name", &s).is_err());
    }

    #[test]
    fn test_validate_traversal_depth() {
        assert!(validate_traversal_depth(DEFAULT_TRAVERSAL_DEPTH).is_ok());
        assert!(validate_traversal_depth(MAX_TRAVERSAL_DEPTH + 1).is_err());
    }
}
