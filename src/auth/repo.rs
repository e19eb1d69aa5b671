use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, full_name, password_hash, profile_picture, \
                            reset_token, reset_token_expiry, created_at";

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub profile_picture: Option<String>,
    /// Argon2 hash of the pending recovery code, if any. Paired with
    /// `reset_token_expiry`: both set or both null.
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expiry: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a new user with an already-hashed password.
    pub async fn create(
        db: &PgPool,
        email: &str,
        full_name: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, full_name, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(full_name)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn update_password(db: &PgPool, id: Uuid, new_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(new_hash)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Partial update of the public profile; password columns untouched.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        full_name: &str,
        profile_picture: Option<&str>,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET full_name = $1, profile_picture = $2 WHERE id = $3
             RETURNING {USER_COLUMNS}"
        ))
        .bind(full_name)
        .bind(profile_picture)
        .bind(id)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Store a fresh recovery credential, overwriting any earlier pending
    /// one (last-request-wins).
    pub async fn set_reset_credential(
        db: &PgPool,
        id: Uuid,
        credential_hash: &str,
        expiry: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET reset_token = $1, reset_token_expiry = $2 WHERE id = $3")
            .bind(credential_hash)
            .bind(expiry)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Replace the password and clear the pending reset in one statement, so
    /// a consumed credential can never outlive the password it authorized.
    pub async fn consume_reset(db: &PgPool, id: Uuid, new_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users
             SET password_hash = $1, reset_token = NULL, reset_token_expiry = NULL
             WHERE id = $2",
        )
        .bind(new_hash)
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_and_reset_columns_never_serialize() {
        let user = User {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            full_name: "Ada".into(),
            password_hash: "$argon2id$secret".into(),
            profile_picture: None,
            reset_token: Some("$argon2id$otp".into()),
            reset_token_expiry: Some(OffsetDateTime::now_utc()),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("reset_token"));
    }
}
