use super::{Migration, SimpleSqlMigration};

pub fn migration() -> impl Migration {
    SimpleSqlMigration {
        serial_number: 0,
        sql: vec![
            r#"
            CREATE TABLE users (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                tokens BIGINT NOT NULL,
                referral_code TEXT UNIQUE NOT NULL,
                is_premium BOOLEAN NOT NULL,
                created TIMESTAMP WITH TIME ZONE NOT NULL
            )"#,
            // Status: 0 pending, 1 confirmed, 2 expired
            r#"
            CREATE TABLE payments (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users,
                plan TEXT NOT NULL,
                currency TEXT NOT NULL,
                usd_amount DOUBLE PRECISION NOT NULL,
                crypto_amount DOUBLE PRECISION NOT NULL,
                address TEXT NOT NULL,
                created TIMESTAMP WITH TIME ZONE NOT NULL,
                expires TIMESTAMP WITH TIME ZONE NOT NULL,
                status INT NOT NULL,
                confirmed_at TIMESTAMP WITH TIME ZONE
            )"#,
            r#"CREATE INDEX payment_user ON payments (user_id, created)"#,
            r#"CREATE INDEX payment_pending_expiry ON payments (expires) WHERE status = 0"#,
        ],
    }
}
