//! In-memory users collection.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use cipherbox_core::error::AppError;
use cipherbox_core::result::AppResult;
use cipherbox_core::traits::UserDirectory;
use cipherbox_core::types::{UserId, UserProfile};

/// User directory kept in a concurrent map.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserDirectory {
    profiles: Arc<DashMap<UserId, UserProfile>>,
}

impl MemoryUserDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn insert_profile(&self, profile: &UserProfile) -> AppResult<()> {
        match self.profiles.entry(profile.uid.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "Profile already exists for {}",
                profile.uid
            ))),
            Entry::Vacant(slot) => {
                slot.insert(profile.clone());
                Ok(())
            }
        }
    }

    async fn find_profile(&self, uid: &UserId) -> AppResult<Option<UserProfile>> {
        Ok(self.profiles.get(uid).map(|p| p.value().clone()))
    }
}
