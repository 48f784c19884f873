//! JSON user-profile store
//!
//! Read-only view of a JSON document mapping user id → profile:
//!
//! ```json
//! { "alice": { "averageTempo": 92, "favoriteKeys": { "G": 4 }, "genreCounts": { "folk": 7 } } }
//! ```
//!
//! A missing file, unknown user or malformed document all read as "no profile".

use crate::providers::UserProfileStore;
use crate::types::{ProviderError, UserProfile};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Profiles stored in one JSON file
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl UserProfileStore for JsonProfileStore {
    async fn read_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, ProviderError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No profile file");
                return Ok(None);
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Profile file unreadable");
                return Ok(None);
            }
        };

        let mut profiles: HashMap<String, UserProfile> = match serde_json::from_str(&content) {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Profile file malformed, ignoring");
                return Ok(None);
            }
        };

        Ok(profiles.remove(user_id))
    }
}
