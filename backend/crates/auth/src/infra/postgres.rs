//! PostgreSQL Repository Implementations

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{AccountLockout, LoginAttempt, RefreshToken, User};
use crate::domain::repository::{
    AccountLockoutRepository, LoginAttemptRepository, RefreshTokenRepository, UserRepository,
};
use crate::domain::value_object::{Email, RoleId, UserId, UserPassword};
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgAuthRepository {
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                id,
                username,
                email,
                password_hash,
                role_id,
                is_active,
                last_login_at,
                created_at,
                updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_user()).transpose()
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT
                id,
                username,
                email,
                password_hash,
                role_id,
                is_active,
                last_login_at,
                created_at,
                updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_user()).transpose()
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                username = $2,
                email = $3,
                password_hash = $4,
                role_id = $5,
                is_active = $6,
                last_login_at = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(&user.username)
        .bind(user.email.as_str())
        .bind(user.password_hash.as_phc_string())
        .bind(user.role_id.value())
        .bind(user.is_active)
        .bind(user.last_login_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Login Attempt Repository Implementation
// ============================================================================

impl LoginAttemptRepository for PgAuthRepository {
    async fn insert(&self, attempt: &LoginAttempt) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO login_attempts (
                id,
                email,
                ip_address,
                user_agent,
                success,
                fail_reason,
                attempted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(attempt.id.as_uuid())
        .bind(&attempt.email)
        .bind(&attempt.ip_address)
        .bind(&attempt.user_agent)
        .bind(attempt.success)
        .bind(attempt.fail_reason.map(|r| r.as_str()))
        .bind(attempt.attempted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_failed_since(&self, email: &str, cutoff: DateTime<Utc>) -> AuthResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM login_attempts
            WHERE email = $1 AND success = FALSE AND attempted_at >= $2
            "#,
        )
        .bind(email)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_failed_by_ip_since(&self, ip: &str, cutoff: DateTime<Utc>) -> AuthResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM login_attempts
            WHERE ip_address = $1 AND success = FALSE AND attempted_at >= $2
            "#,
        )
        .bind(ip)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// ============================================================================
// Account Lockout Repository Implementation
// ============================================================================

impl AccountLockoutRepository for PgAuthRepository {
    async fn insert(&self, lockout: &AccountLockout) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO account_lockouts (
                id,
                user_id,
                email,
                locked_at,
                unlocked_at,
                failed_count,
                reason,
                is_active
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(lockout.id.as_uuid())
        .bind(lockout.user_id.as_uuid())
        .bind(&lockout.email)
        .bind(lockout.locked_at)
        .bind(lockout.unlocked_at)
        .bind(lockout.failed_count)
        .bind(&lockout.reason)
        .bind(lockout.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_in_force(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<AccountLockout>> {
        let row = sqlx::query_as::<_, AccountLockoutRow>(
            r#"
            SELECT
                id,
                user_id,
                email,
                locked_at,
                unlocked_at,
                failed_count,
                reason,
                is_active
            FROM account_lockouts
            WHERE email = $1
              AND is_active = TRUE
              AND (unlocked_at IS NULL OR unlocked_at > $2)
            ORDER BY locked_at DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AccountLockoutRow::into_lockout))
    }

    async fn deactivate(&self, email: &str) -> AuthResult<u64> {
        let released = sqlx::query(
            r#"
            UPDATE account_lockouts
            SET is_active = FALSE, unlocked_at = $2
            WHERE email = $1 AND is_active = TRUE
            "#,
        )
        .bind(email)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(released)
    }

    async fn deactivate_locked_before(&self, cutoff: DateTime<Utc>) -> AuthResult<u64> {
        let released = sqlx::query(
            r#"
            UPDATE account_lockouts
            SET is_active = FALSE, unlocked_at = $2
            WHERE is_active = TRUE AND locked_at < $1
            "#,
        )
        .bind(cutoff)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(released)
    }
}

// ============================================================================
// Refresh Token Repository Implementation
// ============================================================================

const REFRESH_TOKEN_COLUMNS: &str = r#"
    id,
    token,
    user_id,
    expires_at,
    revoked,
    replaced_by,
    ip_address,
    user_agent,
    created_at,
    revoked_at
"#;

impl RefreshTokenRepository for PgAuthRepository {
    async fn insert(&self, token: &RefreshToken) -> AuthResult<()> {
        insert_refresh_token(&self.pool, token).await
    }

    async fn find_by_token(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            "SELECT {REFRESH_TOKEN_COLUMNS} FROM refresh_tokens WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RefreshTokenRow::into_token))
    }

    async fn find_revoked(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            "SELECT {REFRESH_TOKEN_COLUMNS} FROM refresh_tokens WHERE token = $1 AND revoked = TRUE"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RefreshTokenRow::into_token))
    }

    async fn is_valid(&self, token: &str) -> AuthResult<bool> {
        let valid = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM refresh_tokens
                WHERE token = $1 AND revoked = FALSE AND expires_at > $2
            )
            "#,
        )
        .bind(token)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(valid)
    }

    async fn mark_revoked(&self, token: &str, replaced_by: Option<&str>) -> AuthResult<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE, revoked_at = $2, replaced_by = $3
            WHERE token = $1 AND revoked = FALSE
            "#,
        )
        .bind(token)
        .bind(Utc::now())
        .bind(replaced_by)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated > 0)
    }

    async fn rotate(&self, new_token: &RefreshToken, old_token: &str) -> AuthResult<bool> {
        let mut tx = self.pool.begin().await?;

        insert_refresh_token(&mut *tx, new_token).await?;

        // Row lock serializes concurrent rotations of the same token; the
        // loser re-reads `revoked = TRUE` and updates nothing.
        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE, revoked_at = $2, replaced_by = $3
            WHERE token = $1 AND revoked = FALSE
            "#,
        )
        .bind(old_token)
        .bind(Utc::now())
        .bind(&new_token.token)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if revoked == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn revoke_all_for_user(&self, user_id: &UserId) -> AuthResult<u64> {
        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE, revoked_at = $2
            WHERE user_id = $1 AND revoked = FALSE
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(revoked)
    }

    async fn delete_expired(&self) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }

    async fn delete_revoked_older_than(&self, age: Duration) -> AuthResult<u64> {
        let deleted = sqlx::query(
            "DELETE FROM refresh_tokens WHERE revoked = TRUE AND revoked_at < $1",
        )
        .bind(Utc::now() - age)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(deleted)
    }

    async fn count_active_for_user(&self, user_id: &UserId) -> AuthResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM refresh_tokens
            WHERE user_id = $1 AND revoked = FALSE AND expires_at > $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_active_for_user(&self, user_id: &UserId) -> AuthResult<Vec<RefreshToken>> {
        let rows = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            r#"
            SELECT {REFRESH_TOKEN_COLUMNS} FROM refresh_tokens
            WHERE user_id = $1 AND revoked = FALSE AND expires_at > $2
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RefreshTokenRow::into_token).collect())
    }
}

async fn insert_refresh_token<'e, E>(executor: E, token: &RefreshToken) -> AuthResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (
            id,
            token,
            user_id,
            expires_at,
            revoked,
            replaced_by,
            ip_address,
            user_agent,
            created_at,
            revoked_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(token.id.as_uuid())
    .bind(&token.token)
    .bind(token.user_id.as_uuid())
    .bind(token.expires_at)
    .bind(token.revoked)
    .bind(token.replaced_by.as_deref())
    .bind(&token.ip_address)
    .bind(&token.user_agent)
    .bind(token.created_at)
    .bind(token.revoked_at)
    .execute(executor)
    .await?;

    Ok(())
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role_id: i32,
    is_active: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AuthResult<User> {
        let password_hash = UserPassword::from_phc_string(self.password_hash)
            .map_err(|e| AuthError::Internal(format!("Invalid password hash for {}: {}", self.id, e)))?;

        Ok(User {
            user_id: UserId::from_uuid(self.id),
            username: self.username,
            email: Email::from_db(self.email),
            password_hash,
            role_id: RoleId::new(self.role_id),
            is_active: self.is_active,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AccountLockoutRow {
    id: Uuid,
    user_id: Uuid,
    email: String,
    locked_at: DateTime<Utc>,
    unlocked_at: Option<DateTime<Utc>>,
    failed_count: i32,
    reason: String,
    is_active: bool,
}

impl AccountLockoutRow {
    fn into_lockout(self) -> AccountLockout {
        AccountLockout {
            id: self.id.into(),
            user_id: UserId::from_uuid(self.user_id),
            email: self.email,
            locked_at: self.locked_at,
            unlocked_at: self.unlocked_at,
            failed_count: self.failed_count,
            reason: self.reason,
            is_active: self.is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    token: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    revoked: bool,
    replaced_by: Option<String>,
    ip_address: String,
    user_agent: String,
    created_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRow {
    fn into_token(self) -> RefreshToken {
        RefreshToken {
            id: self.id.into(),
            token: self.token,
            user_id: UserId::from_uuid(self.user_id),
            expires_at: self.expires_at,
            revoked: self.revoked,
            replaced_by: self.replaced_by,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            created_at: self.created_at,
            revoked_at: self.revoked_at,
        }
    }
}
