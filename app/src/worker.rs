use async_trait::async_trait;
use std::time::Duration;

use crate::swallow_panic;

/// A background job that runs forever, sleeping [`Worker::timeout`] between runs.
#[async_trait]
pub trait Worker: Send {
    const NAME: &'static str;

    async fn run(&mut self);
    fn timeout() -> Duration;
}

pub fn start<W: Worker + 'static>(mut worker: W) {
    log::info!("starting {} worker", W::NAME);
    tokio::spawn(async move {
        loop {
            if !swallow_panic(worker.run()).await {
                log::error!("{} worker panicked, running again after timeout", W::NAME);
            }
            tokio::time::sleep(W::timeout()).await;
        }
    });
}
