//! Batched relay of file matches to the peer sink.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::peer::SearchPeer;
use crate::types::{ProviderHandle, SessionId};

/// Matches per relay batch. Amortizes peer-relay overhead without letting
/// partial results lag noticeably behind the provider.
pub const MATCH_BATCH_SIZE: usize = 512;

/// Bound on in-flight batches between producer and relay. A stalled peer
/// backpressures the provider-driving task here instead of buffering
/// without limit.
const RELAY_CHANNEL_CAPACITY: usize = 64;

/// Spawn the relay task draining batches to the peer for one
/// (handle, session) pair.
///
/// The relay preserves batch order. It stops once the producer side is
/// dropped; awaiting the join handle before settling the request gives the
/// guarantee that every batch produced before the terminal event reached
/// the peer first.
pub fn spawn_match_relay(
    peer: Arc<dyn SearchPeer>,
    handle: ProviderHandle,
    session: SessionId,
) -> (mpsc::Sender<Vec<Url>>, JoinHandle<()>) {
    let (batch_tx, mut batch_rx) = mpsc::channel::<Vec<Url>>(RELAY_CHANNEL_CAPACITY);
    let relay = tokio::spawn(async move {
        while let Some(resources) = batch_rx.recv().await {
            peer.handle_file_match(handle, session, resources);
        }
    });
    (batch_tx, relay)
}

/// Accumulates matches and flushes them to the relay channel in batches.
pub struct MatchBatcher {
    batch_tx: mpsc::Sender<Vec<Url>>,
    pending: Vec<Url>,
}

impl MatchBatcher {
    pub fn new(batch_tx: mpsc::Sender<Vec<Url>>) -> Self {
        Self {
            batch_tx,
            pending: Vec::new(),
        }
    }

    /// Queue one match, flushing when the current batch fills up.
    pub async fn push(&mut self, resource: Url) {
        self.pending.push(resource);
        if self.pending.len() >= MATCH_BATCH_SIZE {
            self.flush().await;
        }
    }

    /// Send whatever is pending as a final, possibly short, batch.
    pub async fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.pending);
        // A closed relay means the request is being torn down; the batch is
        // dropped along with it.
        let _ = self.batch_tx.send(batch).await;
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use tokio::time::{timeout, Duration};

    use super::*;
    use crate::types::TextSearchMatch;

    #[derive(Default)]
    struct RecordingPeer {
        batches: Mutex<Vec<Vec<Url>>>,
    }

    impl SearchPeer for RecordingPeer {
        fn handle_file_match(
            &self,
            _handle: ProviderHandle,
            _session: SessionId,
            resources: Vec<Url>,
        ) {
            self.batches.lock().push(resources);
        }

        fn handle_text_match(
            &self,
            _handle: ProviderHandle,
            _session: SessionId,
            _result: TextSearchMatch,
        ) {
        }

        fn unregister_provider(&self, _handle: ProviderHandle) {}
    }

    fn file_url(path: &str) -> Url {
        Url::from_file_path(path).expect("url")
    }

    #[tokio::test]
    async fn full_batches_flush_eagerly_and_tail_flushes_on_demand() {
        let peer = Arc::new(RecordingPeer::default());
        let (batch_tx, relay) =
            spawn_match_relay(peer.clone(), ProviderHandle(1), SessionId(1));
        let mut batcher = MatchBatcher::new(batch_tx);

        for index in 0..MATCH_BATCH_SIZE + 3 {
            batcher.push(file_url(&format!("/w/file-{index}"))).await;
        }
        batcher.flush().await;
        drop(batcher);
        timeout(Duration::from_secs(2), relay)
            .await
            .expect("relay finishes")
            .expect("relay task");

        let batches = peer.batches.lock();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), MATCH_BATCH_SIZE);
        assert_eq!(batches[1].len(), 3);
    }

    #[tokio::test]
    async fn relay_preserves_batch_order() {
        let peer = Arc::new(RecordingPeer::default());
        let (batch_tx, relay) =
            spawn_match_relay(peer.clone(), ProviderHandle(1), SessionId(1));

        for index in 0..5 {
            batch_tx
                .send(vec![file_url(&format!("/w/batch-{index}"))])
                .await
                .expect("send");
        }
        drop(batch_tx);
        timeout(Duration::from_secs(2), relay)
            .await
            .expect("relay finishes")
            .expect("relay task");

        let batches = peer.batches.lock();
        let order: Vec<_> = batches
            .iter()
            .map(|batch| batch[0].path().to_string())
            .collect();
        assert_eq!(
            order,
            vec!["/w/batch-0", "/w/batch-1", "/w/batch-2", "/w/batch-3", "/w/batch-4"]
        );
    }
}
