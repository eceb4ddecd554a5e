use std::sync::Arc;

use app::user;
use dashmap::{mapref::entry::Entry, DashMap};
use std::time::Duration;

/// Allows each user at most `limit` requests within any window of length `span`.
pub struct RateLimit {
    limit: usize,
    span: Duration,
    counter: Arc<DashMap<user::Id, usize>>,
}

impl RateLimit {
    pub fn new(limit: usize, span: Duration) -> Self {
        Self {
            limit,
            span,
            counter: Arc::new(Default::default()),
        }
    }

    /// Returns true if the user should be rate limited, false otherwise. Every request that is
    /// let through is forgotten again after `span`.
    pub fn limit(&self, user_id: user::Id) -> bool {
        match self.counter.entry(user_id) {
            Entry::Occupied(mut count) => {
                let count = count.get_mut();
                if *count >= self.limit {
                    return true;
                }
                *count += 1;
            }
            Entry::Vacant(e) => {
                if self.limit == 0 {
                    return true;
                }
                e.insert(1);
            }
        }
        self.decrement_later(user_id);
        false
    }

    fn decrement_later(&self, user_id: user::Id) {
        let counter = Arc::clone(&self.counter);
        let span = self.span;
        tokio::spawn(async move {
            tokio::time::sleep(span).await;
            match counter.entry(user_id) {
                Entry::Occupied(mut e) => {
                    let v = e.get_mut();
                    *v -= 1;
                    if *v == 0 {
                        e.remove();
                    }
                }
                Entry::Vacant(_) => {
                    log::error!(
                        "entry should not be vacant, this is a bug. user id {:?}",
                        user_id
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn limits_each_user_separately() {
        let rate_limit = RateLimit::new(2, Duration::from_secs(60));
        let alice = user::Id(Uuid::from_u128(1));
        let bob = user::Id(Uuid::from_u128(2));
        assert!(!rate_limit.limit(alice));
        assert!(!rate_limit.limit(alice));
        assert!(rate_limit.limit(alice));
        assert!(!rate_limit.limit(bob));
    }

    #[tokio::test]
    async fn requests_are_forgotten_after_the_span() {
        let rate_limit = RateLimit::new(1, Duration::from_millis(20));
        let alice = user::Id(Uuid::from_u128(1));
        assert!(!rate_limit.limit(alice));
        assert!(rate_limit.limit(alice));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!rate_limit.limit(alice));
        assert!(rate_limit.counter.contains_key(&alice));
    }

    #[tokio::test]
    async fn zero_limit_blocks_everyone() {
        let rate_limit = RateLimit::new(0, Duration::from_secs(1));
        assert!(rate_limit.limit(user::Id(Uuid::from_u128(1))));
    }
}
