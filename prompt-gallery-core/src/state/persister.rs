//! Write-back persistence of [`UserState`]
//!
//! Impactful changes are written immediately with [`StatePersister::save_now`].
//! Low-value changes call [`StatePersister::schedule_save`], which coalesces
//! every call inside the delay window into one write. [`StatePersister::shutdown`]
//! flushes whatever is pending; dropping a dirty persister makes one last
//! best-effort attempt on the current runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::UserState;
use crate::error::{GalleryError, Result};
use crate::store::StateStore;

/// Delay before a scheduled save is written
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_secs(600);

/// How the saved state was obtained
#[derive(Debug)]
pub enum LoadOutcome {
    /// A saved payload was restored
    Restored,
    /// Nothing was saved yet
    Fresh,
    /// The payload could not be interpreted; defaults are in use
    Malformed,
    /// The store failed; defaults are in use
    Failed(GalleryError),
}

pub struct StatePersister {
    store: Arc<dyn StateStore>,
    state: Arc<Mutex<UserState>>,
    dirty: Arc<AtomicBool>,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

fn lock(state: &Mutex<UserState>) -> MutexGuard<'_, UserState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn write(
    store: &dyn StateStore,
    state: &Mutex<UserState>,
    dirty: &AtomicBool,
) -> Result<()> {
    let payload = lock(state).to_json()?;
    dirty.store(false, Ordering::SeqCst);
    if let Err(e) = store.save(&payload).await {
        dirty.store(true, Ordering::SeqCst);
        return Err(e);
    }
    debug!("Saved user state ({} bytes)", payload.len());
    Ok(())
}

impl StatePersister {
    pub fn new(store: Arc<dyn StateStore>, delay: Duration) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(UserState::default())),
            dirty: Arc::new(AtomicBool::new(false)),
            delay,
            pending: None,
        }
    }

    /// Load the saved state, falling back to defaults on any failure
    pub async fn load(&mut self) -> LoadOutcome {
        let (state, outcome) = match self.store.load().await {
            Ok(Some(payload)) => match UserState::from_json(&payload) {
                Some(state) => (state, LoadOutcome::Restored),
                None => (UserState::default(), LoadOutcome::Malformed),
            },
            Ok(None) => (UserState::default(), LoadOutcome::Fresh),
            Err(e) => {
                warn!("Failed to load user state: {}", e);
                (UserState::default(), LoadOutcome::Failed(e))
            }
        };

        *lock(&self.state) = state;
        self.dirty.store(false, Ordering::SeqCst);
        outcome
    }

    /// Read the in-memory state
    pub fn read<R>(&self, f: impl FnOnce(&UserState) -> R) -> R {
        f(&lock(&self.state))
    }

    /// Mutate the in-memory state; the change is unsaved until a save runs
    pub fn update<R>(&self, f: impl FnOnce(&mut UserState) -> R) -> R {
        let result = f(&mut lock(&self.state));
        self.dirty.store(true, Ordering::SeqCst);
        result
    }

    pub fn snapshot(&self) -> UserState {
        lock(&self.state).clone()
    }

    /// Whether in-memory changes have not been written yet
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn has_pending_save(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Write the current state now, cancelling any scheduled save
    pub async fn save_now(&mut self) -> Result<()> {
        self.cancel_pending();
        write(self.store.as_ref(), &self.state, &self.dirty).await
    }

    /// Write the current state after the delay
    ///
    /// Each call restarts the delay, so a burst of changes ends in one write.
    pub fn schedule_save(&mut self) {
        self.cancel_pending();

        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let dirty = Arc::clone(&self.dirty);
        let delay = self.delay;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = write(store.as_ref(), &state, &dirty).await {
                warn!("Scheduled state save failed: {}", e);
            }
        }));
    }

    /// Cancel the scheduled save and flush once if anything is unsaved
    pub async fn shutdown(&mut self) -> Result<()> {
        self.cancel_pending();
        if self.is_dirty() {
            write(self.store.as_ref(), &self.state, &self.dirty).await?;
        }
        Ok(())
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for StatePersister {
    fn drop(&mut self) {
        self.cancel_pending();
        if !self.is_dirty() {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("User state dropped unsaved outside a runtime");
            return;
        };

        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let dirty = Arc::clone(&self.dirty);
        handle.spawn(async move {
            if let Err(e) = write(store.as_ref(), &state, &dirty).await {
                warn!("Final state flush failed: {}", e);
            }
        });
    }
}
