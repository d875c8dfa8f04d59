//! Repository for the `reference_profiles` table.

use faceverify_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::reference_profile::{CreateReferenceProfile, ReferenceProfile};

const COLUMNS: &str = "id, image_path, descriptor, dimension, created_at";

pub struct ReferenceProfileRepo;

impl ReferenceProfileRepo {
    /// Append a new profile. It becomes the active reference.
    pub async fn create(
        pool: &PgPool,
        input: &CreateReferenceProfile,
    ) -> Result<ReferenceProfile, sqlx::Error> {
        let query = format!(
            "INSERT INTO reference_profiles (image_path, descriptor, dimension)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReferenceProfile>(&query)
            .bind(&input.image_path)
            .bind(Json(&input.descriptor))
            .bind(input.descriptor.dimension() as i32)
            .fetch_one(pool)
            .await
    }

    /// The most recently created profile, if any.
    ///
    /// Ordered by id so two profiles created in the same clock tick still
    /// resolve deterministically.
    pub async fn find_active(pool: &PgPool) -> Result<Option<ReferenceProfile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reference_profiles
             ORDER BY id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, ReferenceProfile>(&query)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ReferenceProfile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reference_profiles WHERE id = $1");
        sqlx::query_as::<_, ReferenceProfile>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Enrolment history, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<ReferenceProfile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reference_profiles ORDER BY id DESC");
        sqlx::query_as::<_, ReferenceProfile>(&query)
            .fetch_all(pool)
            .await
    }
}
