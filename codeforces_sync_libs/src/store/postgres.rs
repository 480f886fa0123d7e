use crate::store::{core::*, model::*};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{migrate::Migrator, postgres::Postgres, Pool};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const PROFILE_COLUMNS: &str = r#"
    "handle",
    "first_name",
    "last_name",
    "email",
    "rank",
    "rating",
    "max_rating",
    "avatar",
    "friend_of_count",
    "last_sync_time",
    "created_at",
    "updated_at"
"#;

const SUBMISSION_COLUMNS: &str = r#"
    "handle",
    "submission_id",
    "contest_id",
    "creation_time_seconds",
    "problem_contest_id",
    "problem_index",
    "problem_name",
    "problem_type",
    "problem_rating",
    "programming_language",
    "verdict"
"#;

pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool: Pool<Postgres> = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_profile(&self, handle: &str) -> Result<Option<Profile>> {
        let sql = format!(r#"SELECT {} FROM "profiles" WHERE "handle" = $1"#, PROFILE_COLUMNS);
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(handle)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let sql = format!(
            r#"SELECT {} FROM "profiles" ORDER BY "handle""#,
            PROFILE_COLUMNS
        );
        let profiles = sqlx::query_as::<_, Profile>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(profiles)
    }

    async fn create_profile(
        &self,
        handle: &str,
        fields: &ProfileFields,
        now: DateTime<Utc>,
    ) -> Result<Profile> {
        let sql = format!(
            r#"
            INSERT INTO "profiles" (
                "handle",
                "first_name",
                "last_name",
                "email",
                "rank",
                "rating",
                "max_rating",
                "avatar",
                "friend_of_count",
                "last_sync_time",
                "created_at",
                "updated_at"
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10, $10)
            ON CONFLICT ("handle") DO NOTHING
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );

        let created = sqlx::query_as::<_, Profile>(&sql)
            .bind(handle)
            .bind(&fields.first_name)
            .bind(&fields.last_name)
            .bind(&fields.email)
            .bind(&fields.rank)
            .bind(fields.rating)
            .bind(fields.max_rating)
            .bind(&fields.avatar)
            .bind(fields.friend_of_count)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        created.ok_or_else(|| StoreError::Duplicate(String::from(handle)))
    }

    async fn update_profile(&self, handle: &str, fields: &ProfileFields) -> Result<Profile> {
        let sql = format!(
            r#"
            UPDATE "profiles" SET
                "first_name" = $2,
                "last_name" = $3,
                "email" = COALESCE($4, "email"),
                "rank" = $5,
                "rating" = $6,
                "max_rating" = GREATEST("max_rating", $7),
                "avatar" = $8,
                "friend_of_count" = COALESCE($9, "friend_of_count"),
                "updated_at" = NOW()
            WHERE "handle" = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );

        let updated = sqlx::query_as::<_, Profile>(&sql)
            .bind(handle)
            .bind(&fields.first_name)
            .bind(&fields.last_name)
            .bind(&fields.email)
            .bind(&fields.rank)
            .bind(fields.rating)
            .bind(fields.max_rating)
            .bind(&fields.avatar)
            .bind(fields.friend_of_count)
            .fetch_optional(&self.pool)
            .await?;

        updated.ok_or_else(|| StoreError::NotFound(String::from(handle)))
    }

    async fn touch_last_sync(&self, handle: &str, now: DateTime<Utc>) -> Result<Profile> {
        let sql = format!(
            r#"
            UPDATE "profiles" SET "last_sync_time" = $2, "updated_at" = NOW()
            WHERE "handle" = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );

        let updated = sqlx::query_as::<_, Profile>(&sql)
            .bind(handle)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        updated.ok_or_else(|| StoreError::NotFound(String::from(handle)))
    }

    async fn rename_profile(&self, handle: &str, new_handle: &str) -> Result<Profile> {
        let sql = format!(
            r#"
            UPDATE "profiles" SET "handle" = $2, "updated_at" = NOW()
            WHERE "handle" = $1
                AND NOT EXISTS (SELECT 1 FROM "profiles" WHERE "handle" = $2)
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );

        let renamed = sqlx::query_as::<_, Profile>(&sql)
            .bind(handle)
            .bind(new_handle)
            .fetch_optional(&self.pool)
            .await?;

        match renamed {
            Some(profile) => Ok(profile),
            None if self.find_profile(new_handle).await?.is_some() => {
                Err(StoreError::Duplicate(String::from(new_handle)))
            }
            None => Err(StoreError::NotFound(String::from(handle))),
        }
    }

    async fn delete_profile(&self, handle: &str) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM "profiles" WHERE "handle" = $1"#)
            .bind(handle)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn replace_contests(&self, handle: &str, contests: &[ContestResult]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(r#"DELETE FROM "contest_results" WHERE "handle" = $1"#)
            .bind(handle)
            .execute(&mut tx)
            .await?;

        let mut inserted = 0;
        for contest in contests.iter() {
            let result = sqlx::query(
                r#"
                INSERT INTO "contest_results" (
                    "handle",
                    "contest_name",
                    "rank",
                    "old_rating",
                    "new_rating",
                    "contest_time"
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(handle)
            .bind(&contest.contest_name)
            .bind(contest.rank)
            .bind(contest.old_rating)
            .bind(contest.new_rating)
            .bind(contest.contest_time)
            .execute(&mut tx)
            .await;

            // 途中で失敗したら削除ごとロールバックして以前の履歴を残す
            match result {
                Ok(result) => inserted += result.rows_affected(),
                Err(e) => {
                    tracing::error!("an error occurred at saving {:?}: {:?}", contest, e);
                    tx.rollback().await?;
                    return Err(StoreError::Database(e));
                }
            }
        }

        tx.commit().await?;

        Ok(inserted)
    }

    async fn delete_contests(&self, handle: &str) -> Result<u64> {
        let result = sqlx::query(r#"DELETE FROM "contest_results" WHERE "handle" = $1"#)
            .bind(handle)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_contests(&self, handle: &str) -> Result<Vec<ContestResult>> {
        let contests = sqlx::query_as::<_, ContestResult>(
            r#"
            SELECT
                "handle",
                "contest_name",
                "rank",
                "old_rating",
                "new_rating",
                "contest_time"
            FROM
                "contest_results"
            WHERE
                "handle" = $1
            ORDER BY
                "contest_time" DESC,
                "id"
            "#,
        )
        .bind(handle)
        .fetch_all(&self.pool)
        .await?;

        Ok(contests)
    }

    async fn delete_submissions(&self, handle: &str) -> Result<u64> {
        let result = sqlx::query(r#"DELETE FROM "submission_records" WHERE "handle" = $1"#)
            .bind(handle)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_submissions(&self, records: &[SubmissionRecord]) -> Result<InsertOutcome> {
        let mut outcome = InsertOutcome {
            attempted: records.len(),
            inserted: 0,
        };

        for record in records.iter() {
            let result = sqlx::query(
                r#"
                INSERT INTO "submission_records" (
                    "handle",
                    "submission_id",
                    "contest_id",
                    "creation_time_seconds",
                    "problem_contest_id",
                    "problem_index",
                    "problem_name",
                    "problem_type",
                    "problem_rating",
                    "programming_language",
                    "verdict"
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ON CONFLICT ("submission_id") DO NOTHING
                "#,
            )
            .bind(&record.handle)
            .bind(record.submission_id)
            .bind(record.contest_id)
            .bind(record.creation_time_seconds)
            .bind(record.problem.contest_id)
            .bind(&record.problem.index)
            .bind(&record.problem.name)
            .bind(&record.problem.problem_type)
            .bind(record.problem.rating)
            .bind(&record.programming_language)
            .bind(&record.verdict)
            .execute(&self.pool)
            .await;

            match result {
                Ok(result) if result.rows_affected() > 0 => outcome.inserted += 1,
                Ok(_) => {
                    tracing::warn!(
                        "submission {} of {} already exists, skipped",
                        record.submission_id,
                        record.handle
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "failed to save submission {} of {}: {:?}",
                        record.submission_id,
                        record.handle,
                        e
                    );
                }
            }
        }

        Ok(outcome)
    }

    async fn count_submissions(&self, handle: &str) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM "submission_records" WHERE "handle" = $1"#)
                .bind(handle)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.max(0) as u64)
    }

    async fn latest_submission_since(
        &self,
        handle: &str,
        since: i64,
    ) -> Result<Option<SubmissionRecord>> {
        let sql = format!(
            r#"
            SELECT {} FROM "submission_records"
            WHERE "handle" = $1 AND "creation_time_seconds" >= $2
            ORDER BY "creation_time_seconds" DESC
            LIMIT 1
            "#,
            SUBMISSION_COLUMNS
        );
        let row = sqlx::query_as::<_, SubmissionRow>(&sql)
            .bind(handle)
            .bind(since)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(SubmissionRecord::from))
    }
}
