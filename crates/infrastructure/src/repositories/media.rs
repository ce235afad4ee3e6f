//! SQLite implementation of `MediaRepo`.

use crate::database::DatabasePool;
use async_trait::async_trait;
use momenarr_core::{Media, MediaRepo, MomenarrError, Result};
use sqlx::Row;

const MEDIA_COLUMNS: &str =
    "trakt_id, imdb, title, year, season, number, on_disk, file, download_id";

pub struct SqliteMediaRepo {
    pool: DatabasePool,
}

impl SqliteMediaRepo {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Media> {
        Ok(Media {
            trakt_id: row.try_get("trakt_id")?,
            imdb: row.try_get("imdb")?,
            title: row.try_get("title")?,
            year: row.try_get("year")?,
            season: row.try_get("season")?,
            number: row.try_get("number")?,
            on_disk: row.try_get("on_disk")?,
            file: row.try_get("file")?,
            download_id: row.try_get("download_id")?,
        })
    }
}

#[async_trait]
impl MediaRepo for SqliteMediaRepo {
    async fn insert(&self, media: &Media) -> Result<()> {
        let result = sqlx::query(&format!(
            "INSERT INTO media ({MEDIA_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(media.trakt_id)
        .bind(&media.imdb)
        .bind(&media.title)
        .bind(media.year)
        .bind(media.season)
        .bind(media.number)
        .bind(media.on_disk)
        .bind(&media.file)
        .bind(media.download_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(MomenarrError::DuplicateKey {
                    resource: format!("media:{}", media.trakt_id),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, trakt_id: i64) -> Result<Option<Media>> {
        let row = sqlx::query(&format!("SELECT {MEDIA_COLUMNS} FROM media WHERE trakt_id = ?"))
            .bind(trakt_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::from_row).transpose().map_err(Into::into)
    }

    async fn update(&self, media: &Media) -> Result<()> {
        sqlx::query(
            "UPDATE media SET imdb = ?, title = ?, year = ?, season = ?, number = ?,
             on_disk = ?, file = ?, download_id = ? WHERE trakt_id = ?",
        )
        .bind(&media.imdb)
        .bind(&media.title)
        .bind(media.year)
        .bind(media.season)
        .bind(media.number)
        .bind(media.on_disk)
        .bind(&media.file)
        .bind(media.download_id)
        .bind(media.trakt_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, trakt_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM media WHERE trakt_id = ?")
            .bind(trakt_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Media>> {
        let rows = sqlx::query(&format!("SELECT {MEDIA_COLUMNS} FROM media"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::from_row).collect::<sqlx::Result<_>>().map_err(Into::into)
    }

    async fn all_trakt_ids(&self) -> Result<Vec<i64>> {
        let rows = sqlx::query("SELECT trakt_id FROM media")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<i64, _>("trakt_id").map_err(Into::into))
            .collect()
    }

    async fn find_not_on_disk(&self) -> Result<Vec<Media>> {
        let rows = sqlx::query(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media WHERE on_disk = 0 ORDER BY trakt_id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::from_row).collect::<sqlx::Result<_>>().map_err(Into::into)
    }
}
