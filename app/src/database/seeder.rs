use super::Database;
use crate::auth::{Keys, PasswordHash};
use chrono::Utc;
use uuid::Uuid;

/// Creates `test-1@user.net` and `test-2@user.net`, password `password-<n>`; the second one is
/// already premium.
pub async fn seed_development_data(db: &Database, keys: &Keys) -> Result<(), sqlx::Error> {
    let mut data_tx = db.begin().await?;
    for index in 1..=2u128 {
        let id = Uuid::from_u128(index);
        let exists = sqlx::query(r#"SELECT id FROM users WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&mut data_tx)
            .await?
            .is_some();
        if exists {
            continue;
        }
        sqlx::query(
            r#"INSERT INTO users (id, name, email, password_hash, tokens, referral_code, is_premium, created)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(id)
        .bind(format!("Test User {}", index))
        .bind(format!("test-{}@user.net", index))
        .bind(PasswordHash::generate(&format!("password-{}", index), keys.password_salt()).as_str())
        .bind(1_000_i64)
        .bind(format!("TESTREF{}", index))
        .bind(index == 2)
        .bind(Utc::now())
        .execute(&mut data_tx)
        .await?;
        log::info!("seeded development user test-{}@user.net", index);
    }
    data_tx.commit().await
}
