use futures::FutureExt;
use std::{future::Future, panic::AssertUnwindSafe};

pub mod auth;
mod concurrency;
pub mod content;
pub mod database;
mod hex;
pub mod payment;
pub mod pricing;
pub mod seconds;
pub mod user;
mod worker;

/// Runs `f` to completion, returning false if it panicked.
async fn swallow_panic(f: impl Future<Output = ()>) -> bool {
    AssertUnwindSafe(f).catch_unwind().await.is_ok()
}
