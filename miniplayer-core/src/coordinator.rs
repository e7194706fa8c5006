//! Process-wide single-active-player policy.
//!
//! One [`AudioCoordinator`] is shared by every mounted player. Claiming it
//! pauses the previous holder before the claim returns, so two players are
//! never audible at the same time.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::debug;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique instance id.
pub fn next_instance_id() -> u64 {
    NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Something that produces audio and can be silenced by a rival.
#[async_trait]
pub trait AudioInstance: Send + Sync {
    /// Stable id, unique within the process.
    fn instance_id(&self) -> u64;

    /// Stop output because another instance claimed the coordinator.
    async fn pause(&self);
}

/// Holds a weak reference to the instance currently allowed to play.
///
/// The coordinator never owns an instance; a dropped instance simply stops
/// being the holder.
#[derive(Default)]
pub struct AudioCoordinator {
    active: Mutex<Option<Weak<dyn AudioInstance>>>,
}

impl AudioCoordinator {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `instance` the active one, pausing any different previous holder.
    ///
    /// The slot stays locked while the rival pauses, so concurrent claims are
    /// totally ordered.
    pub async fn claim(&self, instance: &Arc<dyn AudioInstance>) {
        let mut active = self.active.lock().await;
        let id = instance.instance_id();

        if let Some(rival) = active.as_ref().and_then(Weak::upgrade) {
            if rival.instance_id() != id {
                debug!("Player {} claims audio, pausing player {}", id, rival.instance_id());
                rival.pause().await;
            }
        }

        *active = Some(Arc::downgrade(instance));
    }

    /// Clear the slot if `instance_id` holds it.
    pub async fn release(&self, instance_id: u64) {
        let mut active = self.active.lock().await;
        let holds = active
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|holder| holder.instance_id() == instance_id);
        if holds {
            *active = None;
        }
    }

    /// Id of the current holder, if it is still alive.
    pub async fn active_id(&self) -> Option<u64> {
        self.active
            .lock()
            .await
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|holder| holder.instance_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct Recorder {
        id: u64,
        log: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl AudioInstance for Recorder {
        fn instance_id(&self) -> u64 {
            self.id
        }

        async fn pause(&self) {
            self.log.lock().unwrap().push(format!("pause {}", self.id));
        }
    }

    fn recorder(log: &Arc<StdMutex<Vec<String>>>) -> Arc<dyn AudioInstance> {
        Arc::new(Recorder {
            id: next_instance_id(),
            log: log.clone(),
        })
    }

    #[tokio::test]
    async fn test_claim_pauses_previous_holder() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let coordinator = AudioCoordinator::new();
        let a = recorder(&log);
        let b = recorder(&log);

        coordinator.claim(&a).await;
        assert!(log.lock().unwrap().is_empty());

        coordinator.claim(&b).await;
        assert_eq!(*log.lock().unwrap(), vec![format!("pause {}", a.instance_id())]);
        assert_eq!(coordinator.active_id().await, Some(b.instance_id()));
    }

    #[tokio::test]
    async fn test_reclaim_by_holder_is_noop() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let coordinator = AudioCoordinator::new();
        let a = recorder(&log);

        coordinator.claim(&a).await;
        coordinator.claim(&a).await;
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_holder_is_forgotten() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let coordinator = AudioCoordinator::new();
        let a = recorder(&log);
        coordinator.claim(&a).await;
        drop(a);

        assert_eq!(coordinator.active_id().await, None);
        let b = recorder(&log);
        coordinator.claim(&b).await;
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_release_only_by_holder() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let coordinator = AudioCoordinator::new();
        let a = recorder(&log);
        let b = recorder(&log);
        coordinator.claim(&a).await;

        coordinator.release(b.instance_id()).await;
        assert_eq!(coordinator.active_id().await, Some(a.instance_id()));
        coordinator.release(a.instance_id()).await;
        assert_eq!(coordinator.active_id().await, None);
    }
}
