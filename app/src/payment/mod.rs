use crate::{
    auth, concurrency,
    database::Database,
    pricing::{Currency, Plan, Wallets},
    user, worker,
};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

mod entities;

pub use entities::{
    Error, Id, Payment, Status, Transition, CONFIRMATION_DELAY, CONFIRMATION_THRESHOLD,
    REQUIRED_CONFIRMATIONS,
};

impl From<concurrency::Error> for Error {
    fn from(e: concurrency::Error) -> Self {
        match e {
            concurrency::Error::Conflict(e) => Error::ConcurrencyConflict(e),
            concurrency::Error::Database(e) => Error::Database(e),
        }
    }
}

pub async fn create(
    grant: &auth::UserGrant,
    db: &Database,
    wallets: &Wallets,
    plan: Plan,
    currency: Currency,
) -> Result<Payment, Error> {
    let payment = Payment::create(grant, wallets, plan, currency, Utc::now())?;
    queries::insert(db, &payment).await?;
    log::info!(
        "created payment {:?} for user {:?}: {} {}",
        payment.id,
        payment.user_id,
        payment.crypto_amount,
        payment.currency
    );
    Ok(payment)
}

/// Polls the payment and persists the outcome. A confirmation credits the plan to the user in the
/// same transaction as the status change, and the status change only applies to a payment that
/// is still pending, so a payment is credited at most once no matter how often it is checked.
pub async fn check(grant: &auth::UserGrant, db: &Database, id: Id) -> Result<Payment, Error> {
    concurrency::retry_loop(|| async {
        let mut data_tx = db.begin().await?;
        let mut payment = queries::get_in_tx(&mut data_tx, id, grant.user_id)
            .await?
            .ok_or(Error::NotFound)?;
        let transition = payment.poll(Utc::now(), rand::random());
        if transition == Transition::Unchanged {
            return Ok::<_, Error>(payment);
        }
        queries::resolve(&mut data_tx, &payment)
            .await?
            .ok_or(concurrency::ConflictError)?;
        if transition == Transition::Confirmed {
            user::grant_premium(&mut data_tx, payment.user_id, payment.plan.tokens()).await?;
            log::info!("payment {:?} confirmed", payment.id);
        } else {
            log::info!("payment {:?} expired", payment.id);
        }
        data_tx.commit().await?;
        Ok::<_, Error>(payment)
    })
    .await
}

/// The most recently confirmed payment of the user, if any.
pub async fn latest_confirmed(
    grant: &auth::UserGrant,
    db: &Database,
) -> Result<Option<Payment>, Error> {
    Ok(queries::latest_confirmed(db, grant.user_id).await?)
}

pub fn start_worker(db: Database) {
    worker::start(ExpiryWorker { db });
}

/// Expires pending payments nobody polls anymore.
struct ExpiryWorker {
    db: Database,
}

#[async_trait]
impl worker::Worker for ExpiryWorker {
    const NAME: &'static str = "payment expiry";

    async fn run(&mut self) {
        match queries::expire_overdue(&self.db, Utc::now()).await {
            Ok(0) => {}
            Ok(count) => log::info!("expired {} overdue payments", count),
            Err(e) => log::error!("failed to expire overdue payments: {}", e),
        }
    }

    fn timeout() -> Duration {
        Duration::from_secs(60)
    }
}

mod queries {
    use super::{Id, Payment, Status};
    use crate::{
        database::{self, Database},
        user,
    };
    use chrono::{DateTime, Utc};
    use const_format::formatcp;
    use uuid::Uuid;

    const COLUMNS: &str = "id, user_id, plan, currency, usd_amount, crypto_amount, address, created, expires, status, confirmed_at";

    const PENDING: i32 = 0;
    const CONFIRMED: i32 = 1;
    const EXPIRED: i32 = 2;

    pub(super) async fn insert(db: &Database, payment: &Payment) -> Result<(), sqlx::Error> {
        sqlx::query(formatcp!(
            "INSERT INTO payments ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            COLUMNS
        ))
        .bind(payment.id.0)
        .bind(payment.user_id.0)
        .bind(payment.plan.as_str())
        .bind(payment.currency.as_str())
        .bind(payment.usd_amount)
        .bind(payment.crypto_amount)
        .bind(&payment.address)
        .bind(payment.created)
        .bind(payment.expires)
        .bind(status_to_i32(&payment.status))
        .bind(confirmed_at(&payment.status))
        .execute(db)
        .await?;
        Ok(())
    }

    /// Moves a pending payment into its final status. Returns `None` if the payment was no
    /// longer pending.
    pub(super) async fn resolve(
        data_tx: &mut database::Transaction,
        payment: &Payment,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        Ok(sqlx::query_as::<_, IdRow>(formatcp!(
            "UPDATE payments SET status = $1, confirmed_at = $2 WHERE id = $3 AND status = {} RETURNING id",
            PENDING
        ))
        .bind(status_to_i32(&payment.status))
        .bind(confirmed_at(&payment.status))
        .bind(payment.id.0)
        .fetch_optional(&mut *data_tx)
        .await?
        .map(|row| row.id))
    }

    pub(super) async fn expire_overdue(db: &Database, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        Ok(sqlx::query(formatcp!(
            "UPDATE payments SET status = {} WHERE status = {} AND expires <= $1",
            EXPIRED,
            PENDING
        ))
        .bind(now)
        .execute(db)
        .await?
        .rows_affected())
    }

    pub(super) async fn get_in_tx(
        data_tx: &mut database::Transaction,
        id: Id,
        user_id: user::Id,
    ) -> Result<Option<Payment>, sqlx::Error> {
        sqlx::query_as::<_, PaymentRow>(formatcp!(
            "SELECT {} FROM payments WHERE id = $1 AND user_id = $2",
            COLUMNS
        ))
        .bind(id.0)
        .bind(user_id.0)
        .fetch_optional(&mut *data_tx)
        .await?
        .map(|row| row.into_entity())
        .transpose()
    }

    pub(super) async fn latest_confirmed(
        db: &Database,
        user_id: user::Id,
    ) -> Result<Option<Payment>, sqlx::Error> {
        sqlx::query_as::<_, PaymentRow>(formatcp!(
            "SELECT {} FROM payments WHERE user_id = $1 AND status = {} ORDER BY confirmed_at DESC LIMIT 1",
            COLUMNS,
            CONFIRMED
        ))
        .bind(user_id.0)
        .fetch_optional(db)
        .await?
        .map(|row| row.into_entity())
        .transpose()
    }

    #[derive(sqlx::FromRow, Debug)]
    struct IdRow {
        id: Uuid,
    }

    #[derive(sqlx::FromRow, Debug)]
    struct PaymentRow {
        id: Uuid,
        user_id: Uuid,
        plan: String,
        currency: String,
        usd_amount: f64,
        crypto_amount: f64,
        address: String,
        created: DateTime<Utc>,
        expires: DateTime<Utc>,
        status: i32,
        confirmed_at: Option<DateTime<Utc>>,
    }

    impl PaymentRow {
        fn into_entity(self) -> Result<Payment, sqlx::Error> {
            let status = self.status()?;
            Ok(Payment {
                id: Id(self.id),
                user_id: user::Id(self.user_id),
                plan: self.plan.parse().map_err(decode_error)?,
                currency: self.currency.parse().map_err(decode_error)?,
                usd_amount: self.usd_amount,
                crypto_amount: self.crypto_amount,
                address: self.address,
                created: self.created,
                expires: self.expires,
                status,
            })
        }

        fn status(&self) -> Result<Status, sqlx::Error> {
            match (self.status, self.confirmed_at) {
                (PENDING, _) => Ok(Status::Pending),
                (CONFIRMED, Some(timestamp)) => Ok(Status::Confirmed { timestamp }),
                (EXPIRED, _) => Ok(Status::Expired),
                (status, _) => Err(sqlx::Error::Decode(
                    format!("invalid payment status {} for {:?}", status, self.id).into(),
                )),
            }
        }
    }

    fn decode_error(e: crate::pricing::Error) -> sqlx::Error {
        sqlx::Error::Decode(Box::new(e))
    }

    fn status_to_i32(status: &Status) -> i32 {
        match status {
            Status::Pending => PENDING,
            Status::Confirmed { .. } => CONFIRMED,
            Status::Expired => EXPIRED,
        }
    }

    fn confirmed_at(status: &Status) -> Option<DateTime<Utc>> {
        match status {
            Status::Confirmed { timestamp } => Some(*timestamp),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        database,
        user::{User, WELCOME_TOKENS},
    };
    use chrono::{DateTime, Duration as ChronoDuration};
    use uuid::Uuid;

    fn wallets() -> Wallets {
        Wallets {
            btc: Some("bc1qexample".to_owned()),
            eth: None,
            usdt: None,
        }
    }

    async fn new_user(db: &Database) -> user::Id {
        let email = format!("{}@example.com", Uuid::new_v4());
        let mut user = User::register("Ada", &email, "secret1", "salt").unwrap();
        user::insert(db, &mut user).await.unwrap();
        user.id
    }

    /// Moves the payment's creation and expiry into the past.
    async fn backdate(db: &Database, payment: &Payment, by: ChronoDuration) {
        let created: DateTime<Utc> = payment.created - by;
        sqlx::query("UPDATE payments SET created = $1, expires = $2 WHERE id = $3")
            .bind(created)
            .bind(payment.expires - by)
            .bind(payment.id.0)
            .execute(db)
            .await
            .unwrap();
    }

    async fn tokens_of(db: &Database, user_id: user::Id) -> (i64, bool) {
        let user = user::get(&auth::UserGrant { user_id }, db)
            .await
            .unwrap()
            .unwrap();
        (user.tokens, user.is_premium)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "needs DATABASE_URL"]
    async fn repeated_and_concurrent_checks_credit_once() {
        let db = database::test_database().await;
        let user_id = new_user(&db).await;
        let grant = auth::UserGrant { user_id };
        let payment = create(&grant, &db, &wallets(), Plan::Monthly, Currency::Btc)
            .await
            .unwrap();
        backdate(&db, &payment, ChronoDuration::seconds(60)).await;

        let handles: Vec<_> = (0..30)
            .map(|_| {
                let db = db.clone();
                let id = payment.id;
                tokio::spawn(async move { check(&auth::UserGrant { user_id }, &db, id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let mut last = None;
        for _ in 0..30 {
            last = Some(check(&grant, &db, payment.id).await.unwrap());
        }

        // With a 70% chance per check, 60 checks leave it pending with negligible probability.
        let last = last.unwrap();
        assert!(matches!(last.status, Status::Confirmed { .. }));
        assert_eq!(last.confirmations(), REQUIRED_CONFIRMATIONS);
        assert_eq!(
            tokens_of(&db, user_id).await,
            (WELCOME_TOKENS + Plan::Monthly.tokens(), true)
        );

        let latest = latest_confirmed(&grant, &db).await.unwrap().unwrap();
        assert_eq!(latest.id, payment.id);
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn overdue_payments_expire_without_credit() {
        let db = database::test_database().await;
        let user_id = new_user(&db).await;
        let grant = auth::UserGrant { user_id };
        let payment = create(&grant, &db, &wallets(), Plan::Yearly, Currency::Btc)
            .await
            .unwrap();
        backdate(&db, &payment, ChronoDuration::minutes(31)).await;

        for _ in 0..5 {
            let checked = check(&grant, &db, payment.id).await.unwrap();
            assert_eq!(checked.status, Status::Expired);
            assert_eq!(checked.confirmations(), 0);
        }
        assert_eq!(tokens_of(&db, user_id).await, (WELCOME_TOKENS, false));
        assert!(latest_confirmed(&grant, &db).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn payments_of_other_users_are_not_found() {
        let db = database::test_database().await;
        let owner = auth::UserGrant {
            user_id: new_user(&db).await,
        };
        let stranger = auth::UserGrant {
            user_id: new_user(&db).await,
        };
        let payment = create(&owner, &db, &wallets(), Plan::Monthly, Currency::Btc)
            .await
            .unwrap();
        assert!(matches!(
            check(&stranger, &db, payment.id).await,
            Err(Error::NotFound)
        ));
    }
}
