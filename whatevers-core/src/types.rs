//! Core record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::Entity;
use crate::error::{DomainError, Result};

/// A named "whatever": the record the service exposes through its repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Whatever {
    id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Whatever {
    /// Creates a record with a generated v4 id.
    pub fn new(name: impl Into<String>, description: Option<String>) -> Result<Self> {
        Self::with_id(Uuid::new_v4(), name, description)
    }

    /// Creates a record under a caller-chosen id (e.g. to replace a stored one in full).
    pub fn with_id(id: Uuid, name: impl Into<String>, description: Option<String>) -> Result<Self> {
        let name = validate_name(name.into())?;
        let now = Utc::now();
        Ok(Self {
            id,
            name,
            description: normalize_description(description),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<()> {
        self.name = validate_name(name.into())?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replaces the description; blank text clears it.
    pub fn describe(&mut self, description: Option<String>) {
        self.description = normalize_description(description);
        self.updated_at = Utc::now();
    }
}

impl Entity for Whatever {
    const COLLECTION: &'static str = "whatevers";

    fn id(&self) -> Uuid {
        self.id
    }
}

fn validate_name(name: String) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation("name must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_name() {
        let w = Whatever::new("  widget ", None).unwrap();
        assert_eq!(w.name, "widget");
        assert_eq!(w.created_at, w.updated_at);
    }

    #[test]
    fn test_blank_name_rejected() {
        let err = Whatever::new("   ", None).unwrap_err();
        assert_eq!(err, DomainError::Validation("name must not be empty".to_string()));
    }

    #[test]
    fn test_blank_description_cleared() {
        let mut w = Whatever::new("widget", Some("first".to_string())).unwrap();
        w.describe(Some("  ".to_string()));
        assert!(w.description.is_none());
    }
}
