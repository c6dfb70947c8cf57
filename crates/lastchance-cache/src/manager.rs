//! Cache manager
//!
//! Install pre-fetches the whole manifest into `<cache_dir>/<generation>/`,
//! activate deletes every other generation, fetch serves cache-first with a
//! network fallback. No partial eviction, no size management: generations
//! are replaced wholesale by name.

use chrono::Utc;
use futures_util::StreamExt;
use rusqlite::OptionalExtension;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

use lastchance_storage::Database;

use crate::manifest::AssetManifest;
use crate::Result;

pub struct CacheManager {
    manifest: AssetManifest,
    /// Parent directory holding one subdirectory per generation
    cache_dir: PathBuf,
    db: Database,
    client: reqwest::Client,
}

impl CacheManager {
    pub fn new(db: Database, cache_dir: PathBuf, manifest: AssetManifest) -> Self {
        Self {
            manifest,
            cache_dir,
            db,
            client: reqwest::Client::new(),
        }
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    fn generation_dir(&self) -> PathBuf {
        self.cache_dir.join(self.manifest.generation())
    }

    /// Pre-fetch every manifest asset into the current generation.
    ///
    /// All-or-nothing: the first failed fetch aborts the install, and a later
    /// retry re-fetches the whole manifest.
    pub async fn install(&self) -> Result<usize> {
        let dir = self.generation_dir();
        tokio::fs::create_dir_all(&dir).await?;

        for asset in self.manifest.assets() {
            self.fetch_into_generation(asset, &dir).await?;
        }

        tracing::info!(
            generation = self.manifest.generation(),
            assets = self.manifest.len(),
            "Cache generation installed"
        );

        Ok(self.manifest.len())
    }

    /// Delete every generation whose name does not match the manifest's,
    /// both on disk and in the asset table. Returns how many were removed.
    pub async fn activate(&self) -> Result<usize> {
        let mut removed = 0;

        if self.cache_dir.is_dir() {
            let mut entries = tokio::fs::read_dir(&self.cache_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if !entry.file_type().await?.is_dir() {
                    continue;
                }
                let name = entry.file_name();
                if name.to_str() == Some(self.manifest.generation()) {
                    continue;
                }

                tokio::fs::remove_dir_all(entry.path()).await?;
                removed += 1;
                tracing::info!(generation = ?name, "Removed stale cache generation");
            }
        }

        let generation = self.manifest.generation().to_string();
        self.db.with_connection(|conn| {
            conn.execute(
                "DELETE FROM cached_assets WHERE generation != ?1",
                [&generation],
            )?;
            Ok(())
        })?;

        Ok(removed)
    }

    /// Serve an asset cache-first, falling back to the network.
    ///
    /// Network fallbacks are returned as-is and not written into the cache,
    /// matching full-generation-replacement semantics.
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        if let Some(path) = self.cached_path(url)? {
            if path.is_file() {
                tracing::debug!(url = %url, "Cache hit");
                return Ok(tokio::fs::read(&path).await?);
            }
        }

        tracing::debug!(url = %url, "Cache miss, falling back to network");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Look up the on-disk path recorded for an asset in this generation
    fn cached_path(&self, url: &Url) -> Result<Option<PathBuf>> {
        let generation = self.manifest.generation().to_string();
        let url = url.as_str().to_string();

        let path = self.db.with_connection(|conn| {
            let path: Option<String> = conn
                .query_row(
                    "SELECT file_path FROM cached_assets
                     WHERE generation = ?1 AND url = ?2",
                    rusqlite::params![generation, url],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(path)
        })?;

        Ok(path.map(PathBuf::from))
    }

    /// Stream one asset to disk and record it in the asset table
    async fn fetch_into_generation(&self, url: &Url, dir: &Path) -> Result<()> {
        let path = dir.join(asset_file_name(url));

        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;

        let mut file = tokio::fs::File::create(&path).await?;
        let mut hasher = Sha256::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        let hash = hex_digest(hasher);
        self.record_asset(url, &path, &hash)?;

        tracing::debug!(url = %url, hash = %hash, "Asset cached");

        Ok(())
    }

    fn record_asset(&self, url: &Url, path: &Path, hash: &str) -> Result<()> {
        let generation = self.manifest.generation().to_string();
        let url = url.as_str().to_string();
        let file_path = path.to_string_lossy().to_string();
        let hash = hash.to_string();
        let fetched_at = Utc::now().to_rfc3339();

        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO cached_assets
                 (generation, url, file_path, hash, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![generation, url, file_path, hash, fetched_at],
            )?;
            Ok(())
        })?;

        Ok(())
    }
}

impl Clone for CacheManager {
    fn clone(&self) -> Self {
        Self {
            manifest: self.manifest.clone(),
            cache_dir: self.cache_dir.clone(),
            db: self.db.clone(),
            client: self.client.clone(),
        }
    }
}

/// Cache file name for an asset: hex SHA-256 of its URL
fn asset_file_name(url: &Url) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

fn hex_digest(hasher: Sha256) -> String {
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> AssetManifest {
        AssetManifest::new(
            "lastchance-v2",
            vec!["https://lastchance.app/style.css".to_string()],
        )
        .unwrap()
    }

    fn seed_asset(manager: &CacheManager, url: &Url, contents: &[u8]) -> PathBuf {
        let dir = manager.generation_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(asset_file_name(url));
        std::fs::write(&path, contents).unwrap();
        manager.record_asset(url, &path, "seeded").unwrap();
        path
    }

    #[test]
    fn test_asset_file_name_is_stable() {
        let url = Url::parse("https://lastchance.app/style.css").unwrap();
        let a = asset_file_name(&url);
        let b = asset_file_name(&url);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_fetch_serves_from_cache() {
        let db = Database::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let manager = CacheManager::new(db, dir.path().to_path_buf(), manifest());

        let url = Url::parse("https://lastchance.app/style.css").unwrap();
        seed_asset(&manager, &url, b"body { margin: 0 }");

        let bytes = manager.fetch(&url).await.unwrap();
        assert_eq!(bytes, b"body { margin: 0 }");
    }

    #[tokio::test]
    async fn test_activate_removes_stale_generations() {
        let db = Database::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let manager = CacheManager::new(db.clone(), dir.path().to_path_buf(), manifest());

        let url = Url::parse("https://lastchance.app/style.css").unwrap();
        seed_asset(&manager, &url, b"current");

        // A leftover previous generation, on disk and in the table
        let stale_dir = dir.path().join("lastchance-v1");
        std::fs::create_dir_all(&stale_dir).unwrap();
        std::fs::write(stale_dir.join("old-asset"), b"old").unwrap();
        db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO cached_assets (generation, url, file_path, hash, fetched_at)
                 VALUES ('lastchance-v1', 'https://lastchance.app/', 'x', NULL, '2026-01-01T00:00:00Z')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let removed = manager.activate().await.unwrap();
        assert_eq!(removed, 1);
        assert!(!stale_dir.exists());
        assert!(dir.path().join("lastchance-v2").exists());

        let stale_rows: i64 = db
            .with_connection(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM cached_assets WHERE generation != 'lastchance-v2'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(stale_rows, 0);

        // Current generation survives intact
        let bytes = manager.fetch(&url).await.unwrap();
        assert_eq!(bytes, b"current");
    }
}
