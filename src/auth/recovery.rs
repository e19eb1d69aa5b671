use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::{
    auth::{
        password::{generate_otp, hash_password, verify_password},
        repo::User,
    },
    error::ApiError,
    mail::{reset_otp_email, Mailer},
};

/// Recovery codes stay valid for ten minutes.
pub const OTP_TTL: Duration = Duration::minutes(10);

/// Returned for every forgot-password request, registered email or not.
pub const GENERIC_RESET_MESSAGE: &str =
    "If your email is registered, we have sent a verification code.";

const INVALID_OR_EXPIRED: &str = "Invalid or expired verification code.";

/// Start a password reset. A fresh code is generated, hashed, stored with
/// its expiry and mailed. Unknown emails take the silent branch so callers
/// cannot probe which addresses are registered. A later request overwrites
/// an earlier pending one, invalidating the previously mailed code.
pub async fn request_reset(
    db: &PgPool,
    mailer: &dyn Mailer,
    email: &str,
) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(ApiError::Validation("Email is required.".into()));
    }

    let Some(user) = User::find_by_email(db, email).await? else {
        info!("password reset requested for unregistered email");
        return Ok(());
    };

    let otp = generate_otp();
    let credential_hash = hash_password(&otp)?;
    let expiry = OffsetDateTime::now_utc() + OTP_TTL;
    User::set_reset_credential(db, user.id, &credential_hash, expiry).await?;

    let (subject, html) = reset_otp_email(&user.full_name, &otp);
    mailer.send(&user.email, &subject, &html).await?;

    info!(user_id = %user.id, "password reset code issued");
    Ok(())
}

/// Consume a pending reset: verify the code against its stored hash, then
/// replace the password and clear the credential in one atomic update so
/// each code works at most once.
pub async fn consume_reset(
    db: &PgPool,
    email: &str,
    otp: &str,
    new_password: &str,
) -> Result<(), ApiError> {
    // Rejected before any lookup.
    if new_password.len() < 6 {
        return Err(ApiError::Validation(
            "New password must be at least 6 characters.".into(),
        ));
    }
    if email.is_empty() || otp.is_empty() {
        return Err(ApiError::Validation("Email and code are required.".into()));
    }

    let Some(user) = User::find_by_email(db, email).await? else {
        warn!("reset consume for unknown email");
        return Err(ApiError::InvalidOrExpired(INVALID_OR_EXPIRED.into()));
    };

    let Some(credential_hash) = pending_credential(&user, OffsetDateTime::now_utc()) else {
        warn!(user_id = %user.id, "no pending or unexpired reset");
        return Err(ApiError::InvalidOrExpired(INVALID_OR_EXPIRED.into()));
    };

    if !verify_password(otp, credential_hash)? {
        warn!(user_id = %user.id, "reset code mismatch");
        return Err(ApiError::InvalidOrExpired(INVALID_OR_EXPIRED.into()));
    }

    let new_hash = hash_password(new_password)?;
    User::consume_reset(db, user.id, &new_hash).await?;

    info!(user_id = %user.id, "password reset completed");
    Ok(())
}

/// The stored credential, if one exists and has not expired. An expired
/// credential is treated exactly like an absent one.
fn pending_credential(user: &User, now: OffsetDateTime) -> Option<&str> {
    match (&user.reset_token, user.reset_token_expiry) {
        (Some(hash), Some(expiry)) if now < expiry => Some(hash.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user_with_reset(
        token: Option<&str>,
        expiry: Option<OffsetDateTime>,
    ) -> User {
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            full_name: "Ada".into(),
            password_hash: "hash".into(),
            profile_picture: None,
            reset_token: token.map(|t| t.to_string()),
            reset_token_expiry: expiry,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn no_pending_reset_yields_nothing() {
        let user = user_with_reset(None, None);
        assert!(pending_credential(&user, OffsetDateTime::now_utc()).is_none());
    }

    #[test]
    fn unexpired_credential_is_returned() {
        let expiry = OffsetDateTime::now_utc() + Duration::minutes(5);
        let user = user_with_reset(Some("stored-hash"), Some(expiry));
        assert_eq!(
            pending_credential(&user, OffsetDateTime::now_utc()),
            Some("stored-hash")
        );
    }

    #[test]
    fn expired_credential_is_treated_as_absent() {
        let expiry = OffsetDateTime::now_utc() - Duration::seconds(1);
        let user = user_with_reset(Some("stored-hash"), Some(expiry));
        assert!(pending_credential(&user, OffsetDateTime::now_utc()).is_none());
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let now = OffsetDateTime::now_utc();
        let user = user_with_reset(Some("stored-hash"), Some(now));
        assert!(pending_credential(&user, now).is_none());
    }

    #[tokio::test]
    async fn short_new_password_is_rejected_before_any_lookup() {
        // The lazy fake pool never connects; reaching the database would
        // error rather than return Validation.
        let state = crate::state::AppState::fake();
        match consume_reset(&state.db, "a@b.c", "123456", "short").await {
            Err(ApiError::Validation(m)) => assert!(m.contains("6 characters")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
