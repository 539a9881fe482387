//! Request validation for sessions and messages.
//!
//! Two flavors, mirroring where checks fire:
//!
//! - **Shape checks** (`validate_create_session`, `validate_add_message`)
//!   inspect a whole request body and aggregate every offending field into a
//!   single `Validation failed: {field=message, ...}` detail.
//! - **Field checks** (`validate_user_id`, `validate_title`,
//!   `validate_pagination`) guard individual values and fail with their
//!   message directly.

use crate::error::{ApiError, AppResult, FieldErrors};
use crate::models::{AddMessageRequest, CreateSessionRequest, Sender};

// =============================================================================
// Validation Constants
// =============================================================================

/// Maximum length for session titles.
pub const MAX_TITLE_LENGTH: usize = 100;

/// Maximum length for user identifiers.
pub const MAX_USER_ID_LENGTH: usize = 255;

/// Maximum length for message content.
pub const MAX_CONTENT_LENGTH: usize = 10_000;

/// Maximum length for message context (50KB).
pub const MAX_CONTEXT_LENGTH: usize = 51_200;

/// Maximum page size for message listing.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Title used when a session is created without one.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Validate a user identifier.
///
/// Rules: required, `[a-zA-Z0-9_]` only, at most 255 characters.
pub fn validate_user_id(user_id: Option<&str>) -> AppResult<&str> {
    let user_id = match user_id {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Err(ApiError::Validation("User ID is required".to_string())),
    };
    if !user_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ApiError::Validation(
            "User ID must contain only alphanumeric characters and underscores".to_string(),
        ));
    }
    if user_id.len() > MAX_USER_ID_LENGTH {
        return Err(ApiError::Validation(format!(
            "User ID must not exceed {MAX_USER_ID_LENGTH} characters"
        )));
    }
    Ok(user_id)
}

/// Validate a session title for rename operations (required there).
pub fn validate_title(title: Option<&str>) -> AppResult<&str> {
    let title = match title {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Err(ApiError::Validation("Title cannot be empty".to_string())),
    };
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::Validation(format!(
            "Title must not exceed {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(title)
}

/// Validate pagination parameters for message listing.
pub fn validate_pagination(page: i64, size: i64) -> AppResult<()> {
    if page < 0 {
        return Err(ApiError::Validation("Page must be >= 0".to_string()));
    }
    if size < 1 || size > MAX_PAGE_SIZE {
        return Err(ApiError::Validation(format!(
            "Size must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    Ok(())
}

/// Validate a create-session request, aggregating all field errors.
///
/// Returns the effective title: the caller-supplied one, or
/// [`DEFAULT_SESSION_TITLE`] when blank or missing.
pub fn validate_create_session(request: &CreateSessionRequest) -> AppResult<(String, String)> {
    let mut errors = FieldErrors::new();

    match request.user_id.as_deref() {
        Some(user_id) if !user_id.trim().is_empty() => {
            if !user_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                errors.push(
                    "userId",
                    "User ID must contain only alphanumeric characters and underscores",
                );
            }
            if user_id.len() > MAX_USER_ID_LENGTH {
                errors.push(
                    "userId",
                    format!("User ID must not exceed {MAX_USER_ID_LENGTH} characters"),
                );
            }
        }
        _ => errors.push("userId", "User ID is required"),
    }

    if let Some(title) = request.title.as_deref()
        && title.chars().count() > MAX_TITLE_LENGTH
    {
        errors.push(
            "title",
            format!("Title must not exceed {MAX_TITLE_LENGTH} characters"),
        );
    }

    errors.into_result()?;

    let user_id = request.user_id.as_deref().unwrap_or_default().to_string();
    let title = match request.title.as_deref() {
        Some(title) if !title.trim().is_empty() => title.to_string(),
        _ => DEFAULT_SESSION_TITLE.to_string(),
    };
    Ok((user_id, title))
}

/// Validate an add-message request, aggregating all field errors.
///
/// Returns the parsed sender together with content and optional context.
pub fn validate_add_message(
    request: &AddMessageRequest,
) -> AppResult<(Sender, String, Option<String>)> {
    let mut errors = FieldErrors::new();

    let sender = match request.sender.as_deref() {
        Some(raw) if !raw.trim().is_empty() => match raw.parse::<Sender>() {
            Ok(sender) => Some(sender),
            Err(_) => {
                errors.push("sender", "Sender must be one of: user, assistant, system");
                None
            }
        },
        _ => {
            errors.push("sender", "Sender is required");
            None
        }
    };

    match request.content.as_deref() {
        Some(content) if !content.trim().is_empty() => {
            if content.chars().count() > MAX_CONTENT_LENGTH {
                errors.push(
                    "content",
                    format!("Content must not exceed {MAX_CONTENT_LENGTH} characters"),
                );
            }
        }
        _ => errors.push("content", "Content is required"),
    }

    if let Some(context) = request.context.as_deref()
        && context.chars().count() > MAX_CONTEXT_LENGTH
    {
        errors.push("context", "Context must not exceed 50KB");
    }

    errors.into_result()?;

    // Errors were empty, so sender and content are present.
    let sender = sender.ok_or_else(|| ApiError::Validation("Sender is required".to_string()))?;
    let content = request.content.clone().unwrap_or_default();
    Ok((sender, content, request.context.clone()))
}
