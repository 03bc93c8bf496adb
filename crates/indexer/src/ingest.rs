use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use sqlblock::Block;

use crate::config::Config;
use crate::source::BlockSource;
use crate::store::BlockStore;


/// The sequential cursor loop.
///
/// One height is fully resolved (persisted and cleaned up) before the
/// next begins. Every per-height failure is absorbed by retrying the
/// same height after a short pause; only the stop signal or the
/// configured end height break the loop.
pub struct Ingest<'a, S> {
    config: &'a Config,
    source: BlockSource,
    store: S,
    stop: watch::Receiver<bool>,
}


impl<'a, S: BlockStore> Ingest<'a, S> {
    pub fn new(
        config: &'a Config,
        source: BlockSource,
        store: S,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            source,
            store,
            stop,
        }
    }

    /// Resolves the height to resume from: the configured start, or the
    /// block after the last committed one, clamped to the genesis floor.
    pub async fn determine_start(&self) -> anyhow::Result<u64> {
        let mut height = self.config.from_block;
        if height == 0 {
            height = self
                .store
                .max_height()
                .await
                .context("can not retrieve last indexed block")?
                .map_or(0, |last| last + 1);
        }
        Ok(height.max(self.config.genesis_block))
    }

    pub async fn run(&mut self, mut height: u64) -> anyhow::Result<()> {
        loop {
            if self.config.to_block > 0 && height >= self.config.to_block {
                info!(to_block = self.config.to_block, "ended on configured block");
                return Ok(());
            }
            if *self.stop.borrow() {
                info!(height, "stop requested");
                return Ok(());
            }

            let bytes = match self.source.read_block(height).await {
                Ok(bytes) => bytes,
                Err(_) => {
                    debug!(height, "waiting for new block");
                    self.pause().await;
                    continue;
                }
            };

            let mut block: Block = match serde_json::from_slice(&bytes) {
                Ok(block) => block,
                Err(err) => {
                    warn!(height, error = ?err, "failed to parse block file, retrying");
                    self.pause().await;
                    continue;
                }
            };
            block.sequence = block.height;

            if let Err(err) = self.store.insert_block(&block).await {
                warn!(height, error = ?err, "unable to import block, retrying");
                self.pause().await;
                continue;
            }

            info!(height, transactions = block.transactions.len(), "indexed block");

            if !self.config.keep_files {
                self.source.cleanup(height).await;
            }
            height += 1;
        }
    }

    /// Fixed short backoff, cut short by the stop signal.
    async fn pause(&mut self) {
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            Ok(()) = self.stop.changed() => {}
        }
    }
}
