//! Item catalog with response caching.
//!
//! Browsing does not need a session. Listings and item detail are cached
//! in memory for the configured TTL (5 minutes by default). Seller changes
//! made through the catalog drop the entries they affect, so the next read
//! goes back to the server.

use std::sync::Arc;
use std::time::Duration;

use craftify_core::{ItemId, SellerId};
use moka::future::Cache;
use tracing::{debug, instrument};

use crate::api::{ApiError, Item, ItemDraft, MarketplaceApi};

const CACHE_CAPACITY: u64 = 1000;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Item(ItemId),
    Items,
}

#[derive(Debug, Clone)]
enum CacheValue {
    Item(Box<Item>),
    Items(Arc<Vec<Item>>),
}

/// Cached view of the items for sale.
pub struct Catalog<A> {
    api: Arc<A>,
    cache: Cache<CacheKey, CacheValue>,
}

impl<A: MarketplaceApi> Catalog<A> {
    /// Create a catalog whose entries live for `ttl`.
    #[must_use]
    pub fn new(api: Arc<A>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { api, cache }
    }

    /// List all items for sale.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Arc<Vec<Item>>, ApiError> {
        if let Some(CacheValue::Items(items)) = self.cache.get(&CacheKey::Items).await {
            debug!("Cache hit for item listing");
            return Ok(items);
        }

        let items = Arc::new(self.api.list_items().await?);

        // Listings double as a warm-up for detail lookups
        for item in items.iter() {
            self.cache
                .insert(CacheKey::Item(item.id), CacheValue::Item(Box::new(item.clone())))
                .await;
        }
        self.cache
            .insert(CacheKey::Items, CacheValue::Items(Arc::clone(&items)))
            .await;

        Ok(items)
    }

    /// Get one item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist or the API request fails.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn get_item(&self, item_id: ItemId) -> Result<Item, ApiError> {
        let key = CacheKey::Item(item_id);
        if let Some(CacheValue::Item(item)) = self.cache.get(&key).await {
            debug!("Cache hit for item");
            return Ok(*item);
        }

        let item = self.api.get_item(item_id).await?;
        self.cache
            .insert(key, CacheValue::Item(Box::new(item.clone())))
            .await;

        Ok(item)
    }

    /// Items listed by one seller, served from the cached listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing has to be fetched and the request fails.
    pub async fn items_by_seller(&self, seller: SellerId) -> Result<Vec<Item>, ApiError> {
        let items = self.list_items().await?;
        Ok(items
            .iter()
            .filter(|item| item.seller == Some(seller))
            .cloned()
            .collect())
    }

    /// List a new item for sale.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the item.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_item(&self, draft: &ItemDraft) -> Result<Item, ApiError> {
        let item = self.api.create_item(draft).await?;
        debug!(item_id = %item.id, "Item listed");
        self.invalidate_item(item.id).await;
        Ok(item)
    }

    /// Replace an item's editable fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the update.
    #[instrument(skip(self, draft), fields(item_id = %item_id))]
    pub async fn update_item(&self, item_id: ItemId, draft: &ItemDraft) -> Result<Item, ApiError> {
        let item = self.api.update_item(item_id, draft).await?;
        self.invalidate_item(item_id).await;
        Ok(item)
    }

    /// Take an item off sale.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses the deletion. The cache is
    /// left alone in that case.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn delete_item(&self, item_id: ItemId) -> Result<(), ApiError> {
        self.api.delete_item(item_id).await?;
        self.invalidate_item(item_id).await;
        Ok(())
    }

    /// Drop one cached item. The listing is dropped too, since it holds a
    /// copy of the item.
    pub async fn invalidate_item(&self, item_id: ItemId) {
        self.cache.invalidate(&CacheKey::Item(item_id)).await;
        self.cache.invalidate(&CacheKey::Items).await;
    }

    /// Drop everything cached.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}
