use crate::{ApiError, Result};

/// Longest accepted cluster or deployment name
pub const MAX_NAME_LEN: usize = 255;

/// Validate a cluster or deployment name
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{} name cannot be empty", kind)));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "{} name is {} bytes long, at most {} allowed",
            kind,
            name.len(),
            MAX_NAME_LEN
        )));
    }
    Ok(())
}

/// Validate the id taken from a request path or body
pub fn validate_id(kind: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{} id is required", kind)));
    }
    Ok(())
}
