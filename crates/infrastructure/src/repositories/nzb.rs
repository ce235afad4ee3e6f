//! SQLite implementation of `NZBRepo`.

use crate::database::DatabasePool;
use async_trait::async_trait;
use momenarr_core::{MomenarrError, Nzb, NzbRepo, Result};
use sqlx::Row;

const NZB_COLUMNS: &str = "release_key, trakt_id, title, link, length, failed, parsed_title,
    year, season, episode, resolution, source, codec, proper, repack,
    validation_score, quality_score, total_score";

pub struct SqliteNzbRepo {
    pool: DatabasePool,
}

impl SqliteNzbRepo {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Nzb> {
        Ok(Nzb {
            release_key: row.try_get("release_key")?,
            trakt_id: row.try_get("trakt_id")?,
            title: row.try_get("title")?,
            link: row.try_get("link")?,
            length: row.try_get("length")?,
            failed: row.try_get("failed")?,
            parsed_title: row.try_get("parsed_title")?,
            year: row.try_get("year")?,
            season: row.try_get("season")?,
            episode: row.try_get("episode")?,
            resolution: row.try_get("resolution")?,
            source: row.try_get("source")?,
            codec: row.try_get("codec")?,
            proper: row.try_get("proper")?,
            repack: row.try_get("repack")?,
            validation_score: row.try_get("validation_score")?,
            quality_score: row.try_get("quality_score")?,
            total_score: row.try_get("total_score")?,
        })
    }
}

#[async_trait]
impl NzbRepo for SqliteNzbRepo {
    async fn insert(&self, nzb: &Nzb) -> Result<()> {
        let result = sqlx::query(&format!(
            "INSERT INTO nzb ({NZB_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&nzb.release_key)
        .bind(nzb.trakt_id)
        .bind(&nzb.title)
        .bind(&nzb.link)
        .bind(nzb.length)
        .bind(nzb.failed)
        .bind(&nzb.parsed_title)
        .bind(nzb.year)
        .bind(nzb.season)
        .bind(nzb.episode)
        .bind(&nzb.resolution)
        .bind(&nzb.source)
        .bind(&nzb.codec)
        .bind(nzb.proper)
        .bind(nzb.repack)
        .bind(nzb.validation_score)
        .bind(nzb.quality_score)
        .bind(nzb.total_score)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(MomenarrError::DuplicateKey {
                    resource: format!("nzb:{}", nzb.release_key),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, release_key: &str) -> Result<Option<Nzb>> {
        let row = sqlx::query(&format!("SELECT {NZB_COLUMNS} FROM nzb WHERE release_key = ?"))
            .bind(release_key)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::from_row).transpose().map_err(Into::into)
    }

    async fn find_by_trakt_id(&self, trakt_id: i64) -> Result<Vec<Nzb>> {
        let rows = sqlx::query(&format!(
            "SELECT {NZB_COLUMNS} FROM nzb WHERE trakt_id = ? ORDER BY rowid"
        ))
        .bind(trakt_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::from_row).collect::<sqlx::Result<_>>().map_err(Into::into)
    }

    async fn mark_failed(&self, title: &str) -> Result<()> {
        sqlx::query("UPDATE nzb SET failed = 1 WHERE title = ?")
            .bind(title)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_by_trakt_id(&self, trakt_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM nzb WHERE trakt_id = ?")
            .bind(trakt_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> DatabasePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn sample_nzb(release_key: &str, total_score: i64) -> Nzb {
        Nzb {
            release_key: release_key.to_string(),
            trakt_id: 1,
            title: format!("title-{release_key}"),
            link: format!("https://indexer.example/dl/{release_key}"),
            length: 1000,
            failed: false,
            parsed_title: "the shawshank redemption".to_string(),
            year: 1994,
            season: 0,
            episode: 0,
            resolution: "2160P".to_string(),
            source: "REMUX".to_string(),
            codec: "X265".to_string(),
            proper: false,
            repack: false,
            validation_score: 100,
            quality_score: 90,
            total_score,
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let repo = SqliteNzbRepo::new(test_pool().await);
        let nzb = sample_nzb("abc123", 190);
        repo.insert(&nzb).await.unwrap();
        let fetched = repo.get("abc123").await.unwrap().unwrap();
        assert_eq!(fetched, nzb);
    }

    #[tokio::test]
    async fn duplicate_insert_is_duplicate_key_error() {
        let repo = SqliteNzbRepo::new(test_pool().await);
        let nzb = sample_nzb("abc123", 190);
        repo.insert(&nzb).await.unwrap();
        let err = repo.insert(&nzb).await.unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[tokio::test]
    async fn mark_failed_excludes_from_best_selection_candidates() {
        let repo = SqliteNzbRepo::new(test_pool().await);
        repo.insert(&sample_nzb("abc123", 190)).await.unwrap();
        repo.mark_failed("title-abc123").await.unwrap();

        let all = repo.find_by_trakt_id(1).await.unwrap();
        assert!(all[0].failed);
    }

    #[tokio::test]
    async fn delete_by_trakt_id_removes_all_candidates() {
        let repo = SqliteNzbRepo::new(test_pool().await);
        repo.insert(&sample_nzb("abc123", 190)).await.unwrap();
        repo.insert(&sample_nzb("def456", 170)).await.unwrap();

        repo.delete_by_trakt_id(1).await.unwrap();
        assert!(repo.find_by_trakt_id(1).await.unwrap().is_empty());
    }
}
