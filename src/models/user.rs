//! User profile model.

use serde::{Deserialize, Serialize};

/// User profile, created by the auth provider.
///
/// Read-only from the points workflow's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Auth provider user ID (also used as document ID)
    pub id: String,
    /// Public display name, unique when present
    pub username: Option<String>,
    pub email: Option<String>,
}

impl UserProfile {
    /// Display name for public listings.
    ///
    /// Falls back to a placeholder built from the first 8 characters of the ID.
    pub fn display_name(&self) -> String {
        match self.username.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => placeholder_name(&self.id),
        }
    }
}

/// Placeholder display name for a user without a (resolvable) username.
pub fn placeholder_name(user_id: &str) -> String {
    let short: String = user_id.chars().take(8).collect();
    format!("User {}", short)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_username() {
        let profile = UserProfile {
            id: "0f8fad5b-d9cb-469f-a165-70867728950e".to_string(),
            username: Some("calm_otter".to_string()),
            email: None,
        };
        assert_eq!(profile.display_name(), "calm_otter");
    }

    #[test]
    fn test_display_name_placeholder() {
        let profile = UserProfile {
            id: "0f8fad5b-d9cb-469f-a165-70867728950e".to_string(),
            username: Some("  ".to_string()),
            email: Some("x@example.com".to_string()),
        };
        assert_eq!(profile.display_name(), "User 0f8fad5b");
        assert_eq!(placeholder_name("abc"), "User abc");
    }
}
