//! Observer feed: follow one target's job state as it changes.
//!
//! A view that opens while a scan is already running needs the state that
//! is stored *now* and then every later write. [`observe_target`] yields
//! both; [`watch_target`] yields only later writes.
//!
//! One broadcast channel carries the updates of every target, so a slow
//! observer can fall behind because of writes it does not care about. When
//! that happens the missed updates are skipped (logged at `warn`) and the
//! target's stored state is re-read and yielded in their place, so the
//! latest state, including a final `complete`, is never lost. Buffered
//! updates equal to or older than the state yielded last are dropped, so the
//! re-read state is not repeated.
//!
//! The feed holds the store weakly: it ends once every owner of the store
//! has dropped it and the buffered updates are drained.

use crate::error::OrderTallyError;
use crate::job::{JobState, JobStore, JobUpdate, TargetId};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::warn;

/// A boxed stream of job states for one target.
pub type JobStateStream = Pin<Box<dyn Stream<Item = JobState> + Send>>;

/// Stream every state written for `target` after this call.
pub fn watch_target(store: &Arc<dyn JobStore>, target: TargetId) -> JobStateStream {
    Box::pin(updates_for(store.subscribe(), Arc::downgrade(store), target, None))
}

/// Stream the currently stored state for `target` (if any), then every
/// later write.
///
/// The subscription is taken before the read, so a write racing with this
/// call is never lost.
pub fn observe_target(
    store: &Arc<dyn JobStore>,
    target: TargetId,
) -> Result<JobStateStream, OrderTallyError> {
    let rx = store.subscribe();
    let current = store.read(&target)?;
    let updates = updates_for(rx, Arc::downgrade(store), target, current.clone());
    Ok(Box::pin(stream::iter(current).chain(updates)))
}

fn updates_for(
    rx: broadcast::Receiver<JobUpdate>,
    store: Weak<dyn JobStore>,
    target: TargetId,
    mut last: Option<JobState>,
) -> impl Stream<Item = JobState> + Send {
    BroadcastStream::new(rx).filter_map(move |item| {
        let state = match item {
            Ok(update) if update.target == target => Some(update.state),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(
                    "Observer for {} lagged; skipped {} updates, re-reading stored state",
                    target, skipped
                );
                stored_state(&store, &target)
            }
        };
        let state = state.filter(|s| !last.as_ref().is_some_and(|l| is_stale(s, l)));
        if let Some(ref s) = state {
            last = Some(s.clone());
        }
        async move { state }
    })
}

/// Already yielded, or behind the state yielded last. Timestamps can tie,
/// so status progress breaks the tie.
fn is_stale(state: &JobState, last: &JobState) -> bool {
    state == last || (state.timestamp, state.status) < (last.timestamp, last.status)
}

fn stored_state(store: &Weak<dyn JobStore>, target: &TargetId) -> Option<JobState> {
    let store = store.upgrade()?;
    match store.read(target) {
        Ok(state) => state,
        Err(e) => {
            warn!("Could not re-read state for {}: {}", target, e);
            None
        }
    }
}
