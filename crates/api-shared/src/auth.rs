/// Header carrying the caller's user id, as returned by signup and login.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing x-user-id header")]
    MissingUserId,
    #[error("malformed x-user-id header")]
    MalformedUserId,
}

/// Validates the shape of a user id header value.
///
/// User ids are 32 lowercase hex characters. This only checks the format; resolving the id to
/// a stored user is the caller's job.
pub fn parse_user_id(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.map(str::trim).ok_or(AuthError::MissingUserId)?;
    if value.is_empty() {
        return Err(AuthError::MissingUserId);
    }

    let ok = value.len() == 32 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if ok {
        Ok(value)
    } else {
        Err(AuthError::MalformedUserId)
    }
}
