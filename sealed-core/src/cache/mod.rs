//! In-memory mirror of the vault
//!
//! [`ItemCache`] keeps two ordered partitions, active and trashed, with ids
//! unique across both. [`SharedItemCache`] wraps it for concurrent use: readers
//! take a shared lock and never wait on the vault CLI, since a reload fetches
//! everything first and only then swaps the contents in.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::bitwarden::VaultCli;
use crate::error::{VaultError, VaultResult};
use crate::models::{ItemId, VaultItem};
use crate::session::SessionKey;

/// Active and trashed vault items
#[derive(Debug, Clone, Default)]
pub struct ItemCache {
    active: Vec<VaultItem>,
    trashed: Vec<VaultItem>,
    loaded: bool,
}

impl ItemCache {
    /// Creates an empty, never-loaded cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces both partitions with a full listing
    ///
    /// Items are placed by their `trashed` flag. If an id appears twice the
    /// first occurrence wins.
    pub fn replace(&mut self, items: impl IntoIterator<Item = VaultItem>) {
        let mut seen = HashSet::new();
        let mut active = Vec::new();
        let mut trashed = Vec::new();
        for item in items {
            if !seen.insert(item.id.clone()) {
                debug!(id = %item.id, "Duplicate item in listing ignored");
                continue;
            }
            if item.trashed {
                trashed.push(item);
            } else {
                active.push(item);
            }
        }
        self.active = active;
        self.trashed = trashed;
        self.loaded = true;
    }

    /// Returns true once a listing has been loaded
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Active items, followed by trashed ones when `include_trashed` is set
    #[must_use]
    pub fn list(&self, include_trashed: bool) -> Vec<VaultItem> {
        let mut items = self.active.clone();
        if include_trashed {
            items.extend(self.trashed.iter().cloned());
        }
        items
    }

    /// Trashed items only
    #[must_use]
    pub fn list_trash(&self) -> Vec<VaultItem> {
        self.trashed.clone()
    }

    /// Looks up an item in either partition
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&VaultItem> {
        self.active
            .iter()
            .chain(self.trashed.iter())
            .find(|item| &item.id == id)
    }

    /// Returns `Some(true)` for a trashed item, `Some(false)` for an active
    /// one and `None` if the id is unknown
    #[must_use]
    pub fn trashed_state(&self, id: &ItemId) -> Option<bool> {
        self.get(id).map(|item| item.trashed)
    }

    /// Inserts or replaces an item
    ///
    /// An item that stays in its partition keeps its position; one that
    /// changes partition is appended to the other.
    pub fn upsert(&mut self, item: VaultItem) {
        let target = if item.trashed {
            &mut self.trashed
        } else {
            &mut self.active
        };
        if let Some(slot) = target.iter_mut().find(|existing| existing.id == item.id) {
            *slot = item;
            return;
        }

        let other = if item.trashed {
            &mut self.active
        } else {
            &mut self.trashed
        };
        other.retain(|existing| existing.id != item.id);

        if item.trashed {
            self.trashed.push(item);
        } else {
            self.active.push(item);
        }
    }

    /// Removes an item from both partitions, returning it if present
    pub fn remove(&mut self, id: &ItemId) -> Option<VaultItem> {
        if let Some(pos) = self.active.iter().position(|item| &item.id == id) {
            return Some(self.active.remove(pos));
        }
        self.trashed
            .iter()
            .position(|item| &item.id == id)
            .map(|pos| self.trashed.remove(pos))
    }

    /// Empties the cache and marks it as not loaded
    pub fn clear(&mut self) {
        self.active.clear();
        self.trashed.clear();
        self.loaded = false;
    }

    /// Number of active items
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Number of trashed items
    #[must_use]
    pub fn trashed_len(&self) -> usize {
        self.trashed.len()
    }
}

/// Cache shared between the service and concurrent readers
#[derive(Debug, Clone, Default)]
pub struct SharedItemCache {
    inner: Arc<RwLock<ItemCache>>,
}

impl SharedItemCache {
    /// Creates an empty shared cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Syncs with the server and rebuilds the cache from a full listing
    ///
    /// Nothing is changed unless the sync and both listings succeed.
    ///
    /// # Errors
    /// Returns `VaultError::Sync` (or `NotAuthenticated`/`ProcessTimeout`)
    /// with the previous contents left in place.
    pub async fn reload(&self, cli: &VaultCli, session: &SessionKey) -> VaultResult<()> {
        let fetched = async {
            cli.sync(session).await?;
            let mut items = cli.list_items(session, false).await?;
            items.extend(cli.list_items(session, true).await?);
            Ok::<_, VaultError>(items)
        }
        .await;

        match fetched {
            Ok(items) => {
                let mut cache = self.inner.write().await;
                cache.replace(items);
                debug!(
                    active = cache.active_len(),
                    trashed = cache.trashed_len(),
                    "Vault cache reloaded"
                );
                Ok(())
            }
            Err(e) => {
                warn!("Vault reload failed, keeping previous cache: {e}");
                Err(e.into_sync())
            }
        }
    }

    /// See [`ItemCache::list`]
    pub async fn list(&self, include_trashed: bool) -> Vec<VaultItem> {
        self.inner.read().await.list(include_trashed)
    }

    /// See [`ItemCache::list_trash`]
    pub async fn list_trash(&self) -> Vec<VaultItem> {
        self.inner.read().await.list_trash()
    }

    /// Returns a copy of an item
    pub async fn get(&self, id: &ItemId) -> Option<VaultItem> {
        self.inner.read().await.get(id).cloned()
    }

    /// See [`ItemCache::trashed_state`]
    pub async fn trashed_state(&self, id: &ItemId) -> Option<bool> {
        self.inner.read().await.trashed_state(id)
    }

    /// See [`ItemCache::is_loaded`]
    pub async fn is_loaded(&self) -> bool {
        self.inner.read().await.is_loaded()
    }

    /// See [`ItemCache::upsert`]
    pub async fn upsert(&self, item: VaultItem) {
        self.inner.write().await.upsert(item);
    }

    /// See [`ItemCache::remove`]
    pub async fn remove(&self, id: &ItemId) -> Option<VaultItem> {
        self.inner.write().await.remove(id)
    }

    /// Marks an item trashed or active, moving it between partitions
    ///
    /// Returns false if the id is unknown.
    pub async fn set_trashed(&self, id: &ItemId, trashed: bool) -> bool {
        let mut cache = self.inner.write().await;
        let Some(mut item) = cache.get(id).cloned() else {
            return false;
        };
        item.trashed = trashed;
        cache.upsert(item);
        true
    }

    /// See [`ItemCache::clear`]
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}
