//! User repository for database operations.

use domain::models::user::UserFilter;
use domain::models::{Role, UserStatus};
use shared::pagination::PageParams;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::user::USER_COLUMNS;
use crate::entities::UserEntity;
use crate::metrics::QueryTimer;

/// Input for [`UserRepository::create_account`].
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub password_hash: &'a str,
    pub role: Role,
    pub must_change_password: bool,
    /// Supplier profile company name.
    pub company_name: Option<&'a str>,
    /// Supplier CNPJ, digits only.
    pub cnpj: Option<&'a str>,
    /// Client CPF/CNPJ, digits only.
    pub document: Option<&'a str>,
}

/// Account row plus the profile created alongside it.
#[derive(Debug, Clone)]
pub struct CreatedAccount {
    pub user: UserEntity,
    pub profile_id: Option<Uuid>,
}

/// Repository for account-related database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Creates a new UserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a user by email address (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_email");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Lists accounts matching the filter. Returns the page and the total count.
    pub async fn list(
        &self,
        filter: &UserFilter,
        page: &PageParams,
    ) -> Result<(Vec<UserEntity>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_users");
        let role = filter.role.map(|r| r.as_str());
        let status = filter.status.map(|s| s.as_str());
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let where_clause = r#"
            WHERE ($1::text IS NULL OR role = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR email ILIKE $3 OR name ILIKE $3)
        "#;

        let rows = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {} FROM users {} ORDER BY created_at DESC LIMIT $4 OFFSET $5",
            USER_COLUMNS, where_clause
        ))
        .bind(role)
        .bind(status)
        .bind(search.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users {}", where_clause))
            .bind(role)
            .bind(status)
            .bind(search.as_deref())
            .fetch_one(&self.pool)
            .await?;

        timer.record();
        Ok((rows, total))
    }

    /// Number of accounts per resolved role.
    pub async fn count_by_role(&self) -> Result<Vec<(String, i64)>, sqlx::Error> {
        let timer = QueryTimer::new("count_users_by_role");
        let result = sqlx::query_as::<_, (String, i64)>(
            "SELECT role, COUNT(*) FROM users GROUP BY role",
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Creates an account and its supplier or client profile atomically.
    pub async fn create_account(
        &self,
        account: &NewAccount<'_>,
    ) -> Result<CreatedAccount, sqlx::Error> {
        let timer = QueryTimer::new("create_account");
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            INSERT INTO users (email, name, phone, password_hash, role, roles, must_change_password)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(account.email)
        .bind(account.name)
        .bind(account.phone)
        .bind(account.password_hash)
        .bind(account.role.as_str())
        .bind(account.role.roles_for())
        .bind(account.must_change_password)
        .fetch_one(&mut *tx)
        .await?;

        let profile_id = match account.role {
            Role::Supplier => Some(
                insert_supplier_profile(
                    &mut tx,
                    user.id,
                    account.company_name.unwrap_or(account.name),
                    account.cnpj,
                    Some(account.email),
                    account.phone,
                )
                .await?,
            ),
            Role::Client => Some(
                insert_client_profile(&mut tx, user.id, account.name, account.document, account.phone)
                    .await?,
            ),
            Role::Admin => None,
        };

        tx.commit().await?;
        timer.record();
        Ok(CreatedAccount { user, profile_id })
    }

    /// Partial update of name, phone, role and status.
    ///
    /// Changing the role rewrites the stored role list and makes sure the
    /// matching profile exists.
    pub async fn update_account(
        &self,
        id: Uuid,
        name: Option<&str>,
        phone: Option<&str>,
        role: Option<Role>,
        status: Option<UserStatus>,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_account");
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                role = COALESCE($4, role),
                roles = COALESCE($5, roles),
                status = COALESCE($6, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(name)
        .bind(phone)
        .bind(role.map(|r| r.as_str()))
        .bind(role.map(|r| r.roles_for()))
        .bind(status.map(|s| s.as_str()))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user) = user else {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        };

        match role {
            Some(Role::Supplier) => {
                sqlx::query(
                    r#"
                    INSERT INTO fornecedores (user_id, company_name, email, phone)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (user_id) DO NOTHING
                    "#,
                )
                .bind(user.id)
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.phone)
                .execute(&mut *tx)
                .await?;
            }
            Some(Role::Client) => {
                sqlx::query(
                    r#"
                    INSERT INTO clientes (user_id, name, phone)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (user_id) DO NOTHING
                    "#,
                )
                .bind(user.id)
                .bind(&user.name)
                .bind(&user.phone)
                .execute(&mut *tx)
                .await?;
            }
            _ => {}
        }

        tx.commit().await?;
        timer.record();
        Ok(Some(user))
    }

    /// Admin password reset: the account must choose a new password on next
    /// login, so the change timestamp is cleared.
    pub async fn reset_password(&self, id: Uuid, password_hash: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("reset_user_password");
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                must_change_password = true,
                password_changed_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Password chosen by the account owner.
    pub async fn change_password(&self, id: Uuid, password_hash: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("change_user_password");
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                must_change_password = false,
                password_changed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Update user's last login timestamp.
    pub async fn record_login(&self, id: Uuid) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("record_user_login");
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(())
    }

    /// Stores a secret generated during setup; not active until confirmed.
    pub async fn set_pending_two_factor(&self, id: Uuid, secret: &str) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("set_pending_two_factor");
        sqlx::query(
            "UPDATE users SET two_factor_pending_secret = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(secret)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(())
    }

    /// Promotes the pending secret and stores hashed backup codes.
    pub async fn enable_two_factor(
        &self,
        id: Uuid,
        secret: &str,
        backup_code_hashes: &[String],
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("enable_two_factor");
        sqlx::query(
            r#"
            UPDATE users
            SET two_factor_enabled = true,
                two_factor_secret = $2,
                two_factor_pending_secret = NULL,
                two_factor_backup_codes = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(secret)
        .bind(backup_code_hashes)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(())
    }

    pub async fn disable_two_factor(&self, id: Uuid) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("disable_two_factor");
        sqlx::query(
            r#"
            UPDATE users
            SET two_factor_enabled = false,
                two_factor_secret = NULL,
                two_factor_pending_secret = NULL,
                two_factor_backup_codes = ARRAY[]::TEXT[],
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(())
    }

    /// Removes a backup code hash. Returns false if it was not present.
    pub async fn consume_backup_code(&self, id: Uuid, code_hash: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("consume_backup_code");
        let result = sqlx::query(
            r#"
            UPDATE users
            SET two_factor_backup_codes = array_remove(two_factor_backup_codes, $2)
            WHERE id = $1 AND $2 = ANY(two_factor_backup_codes)
            "#,
        )
        .bind(id)
        .bind(code_hash)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Deletes an account; client profile, quotes and chats cascade.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_user");
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }
}

async fn insert_supplier_profile(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    company_name: &str,
    cnpj: Option<&str>,
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO fornecedores (user_id, company_name, cnpj, email, phone)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(company_name)
    .bind(cnpj)
    .bind(email)
    .bind(phone)
    .fetch_one(&mut **tx)
    .await
}

async fn insert_client_profile(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    name: &str,
    document: Option<&str>,
    phone: Option<&str>,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO clientes (user_id, name, document, phone)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(document)
    .bind(phone)
    .fetch_one(&mut **tx)
    .await
}
