//! Catalog repository: genres, media, platforms and roles.

use crate::error::StoreResult;
use crate::models::{GenreCountRow, GenreRow, MediaRow, PlatformRow, RoleRow};
use async_trait::async_trait;

/// Repository for reference data.
#[async_trait]
pub trait CatalogRepo: Send + Sync {
    /// Create a genre. Names are unique.
    async fn create_genre(&self, name: &str) -> StoreResult<GenreRow>;

    /// List all genres ordered by id.
    async fn list_genres(&self) -> StoreResult<Vec<GenreRow>>;

    /// Genres ordered by number of tagged reviews (descending, ties by id).
    async fn top_genres(&self, limit: u32) -> StoreResult<Vec<GenreCountRow>>;

    /// Create a media entry.
    async fn create_media(&self, name: &str) -> StoreResult<MediaRow>;

    /// List all media ordered by id.
    async fn list_media(&self) -> StoreResult<Vec<MediaRow>>;

    /// Create a platform.
    async fn create_platform(&self, name: &str) -> StoreResult<PlatformRow>;

    /// List all platforms ordered by id.
    async fn list_platforms(&self) -> StoreResult<Vec<PlatformRow>>;

    /// List all roles ordered by id.
    async fn list_roles(&self) -> StoreResult<Vec<RoleRow>>;
}
