use std::collections::BTreeSet;

use crate::error::{AppError, AppResult};

/// Allow/block list over source property ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PropertyFilter {
    #[default]
    All,
    Allow(BTreeSet<String>),
    Block(BTreeSet<String>),
}

impl PropertyFilter {
    /// Build a filter from optional CLI lists. Empty lists count as absent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidArgument` if both lists are non-empty.
    pub fn new(allowed: Option<Vec<String>>, blocked: Option<Vec<String>>) -> AppResult<Self> {
        let allowed = allowed.filter(|a| !a.is_empty());
        let blocked = blocked.filter(|b| !b.is_empty());

        match (allowed, blocked) {
            (Some(_), Some(_)) => Err(AppError::InvalidArgument(
                "allowed and blocked lists are mutually exclusive".to_string(),
            )),
            (Some(allowed), None) => Ok(Self::Allow(allowed.into_iter().collect())),
            (None, Some(blocked)) => Ok(Self::Block(blocked.into_iter().collect())),
            (None, None) => Ok(Self::All),
        }
    }

    #[must_use]
    pub fn allows(&self, source_property_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Allow(ids) => ids.contains(source_property_id),
            Self::Block(ids) => !ids.contains(source_property_id),
        }
    }
}
