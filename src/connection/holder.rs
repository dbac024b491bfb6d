//! Per-caller connection slots.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

use tracing::{info, warn};

use crate::error::{ExchangeError, Result};

use super::config::ExchangerConfig;
use super::connector::{Channel, Connector, PeerAddr};
use super::reconnect::Reconnector;
use super::state::{ConnectionState, ConnectionStats};

/// Connection and state of one caller thread.
struct Slot<Ch> {
    channel: Option<Ch>,
    state: ConnectionState,
}

impl<Ch> Default for Slot<Ch> {
    fn default() -> Self {
        Self {
            channel: None,
            state: ConnectionState::Disconnected,
        }
    }
}

/// Thread a slot belongs to, and whether it has exited.
#[derive(Debug, Clone)]
struct Caller {
    id: ThreadId,
    exited: Arc<AtomicBool>,
}

impl Caller {
    fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }
}

/// Drops a thread's slot from every holder it used.
trait ReleaseSlot {
    fn release_slot(&self, id: ThreadId);
}

/// Per-thread record of the holders that keep a slot for this thread.
///
/// Dropped when the thread exits, which closes those slots.
struct CallerExit {
    caller: Caller,
    holders: RefCell<Vec<Weak<dyn ReleaseSlot>>>,
}

impl CallerExit {
    fn new() -> Self {
        Self {
            caller: Caller {
                id: thread::current().id(),
                exited: Arc::new(AtomicBool::new(false)),
            },
            holders: RefCell::new(Vec::new()),
        }
    }

    fn register(&self, holder: Weak<dyn ReleaseSlot>) {
        let mut holders = self.holders.borrow_mut();
        holders.retain(|h| h.strong_count() > 0);
        if !holders.iter().any(|h| Weak::ptr_eq(h, &holder)) {
            holders.push(holder);
        }
    }
}

impl Drop for CallerExit {
    fn drop(&mut self) {
        // Set before releasing so a pending reconnect cannot refill the slot.
        self.caller.exited.store(true, Ordering::SeqCst);
        for holder in self.holders.get_mut().drain(..) {
            if let Some(holder) = holder.upgrade() {
                holder.release_slot(self.caller.id);
            }
        }
    }
}

thread_local! {
    static CALLER_EXIT: CallerExit = CallerExit::new();
}

/// Holds at most one connection per caller thread to a single peer.
///
/// Methods without a `ThreadId` act on the calling thread's slot. The slot
/// map is locked only to look up, insert or remove; socket I/O runs on the
/// handles returned by [`streams`](ConnectionHolder::streams). A thread's
/// slot is closed and removed when that thread exits.
///
/// The connect attempt counter is shared by all slots. It starts at 1, is
/// reset to 1 by every successful open, and never grows past
/// `max_connect_attempts + 1`. Once past the budget, opens are no-ops until
/// [`reset_connect_attempts`](ConnectionHolder::reset_connect_attempts).
pub struct ConnectionHolder<C: Connector> {
    peer: PeerAddr,
    config: ExchangerConfig,
    connector: C,
    slots: Mutex<HashMap<ThreadId, Slot<C::Channel>>>,
    connect_attempts: AtomicU32,
    stats: Mutex<ConnectionStats>,
    reconnector: Reconnector,
}

impl<C: Connector> ConnectionHolder<C> {
    pub fn new(peer: PeerAddr, config: ExchangerConfig, connector: C) -> Self {
        let reconnector = Reconnector::new(config.reconnect_interval);
        Self {
            peer,
            config,
            connector,
            slots: Mutex::new(HashMap::new()),
            connect_attempts: AtomicU32::new(1),
            stats: Mutex::new(ConnectionStats::default()),
            reconnector,
        }
    }

    pub fn peer(&self) -> &PeerAddr {
        &self.peer
    }

    pub fn config(&self) -> &ExchangerConfig {
        &self.config
    }

    pub fn stats(&self) -> ConnectionStats {
        self.lock_stats().clone()
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    /// Allow opens again after the connect budget was exhausted.
    pub fn reset_connect_attempts(&self) {
        self.connect_attempts.store(1, Ordering::SeqCst);
    }

    /// State of the calling thread's connection.
    pub fn state(&self) -> ConnectionState {
        self.lock_slots()
            .get(&thread::current().id())
            .map_or(ConnectionState::Disconnected, |slot| slot.state)
    }

    /// Check if no open connection is held for the calling thread.
    pub fn is_closed(&self) -> bool {
        self.lock_slots()
            .get(&thread::current().id())
            .and_then(|slot| slot.channel.as_ref())
            .is_none_or(|channel| channel.is_closed())
    }

    /// Check if the calling thread's last open succeeded.
    pub fn is_enabled(&self) -> bool {
        self.state().is_connected()
    }

    /// Open a connection if none is held, then report whether one is usable.
    pub fn check_socket(self: &Arc<Self>) -> bool {
        if self.is_closed() {
            self.open();
        }
        self.is_enabled()
    }

    /// Open a connection for the calling thread.
    pub fn open(self: &Arc<Self>) {
        if let Some(caller) = self.enter() {
            self.open_slot(&caller);
        }
    }

    /// Close the calling thread's connection.
    pub fn close(&self) {
        self.close_slot(thread::current().id());
    }

    /// Acquire read and write handles on the calling thread's connection.
    pub fn streams(
        &self,
    ) -> Result<(
        <C::Channel as Channel>::Reader,
        <C::Channel as Channel>::Writer,
    )> {
        let slots = self.lock_slots();
        let channel = slots
            .get(&thread::current().id())
            .and_then(|slot| slot.channel.as_ref())
            .filter(|channel| !channel.is_closed())
            .ok_or(ExchangeError::NotConnected)?;
        Ok(channel.streams()?)
    }

    pub(crate) fn record_send(&self, bytes: usize) {
        self.lock_stats().record_send(bytes);
    }

    pub(crate) fn record_receive(&self, bytes: usize) {
        self.lock_stats().record_receive(bytes);
    }

    /// Stop opening connections, abort pending reconnects and close every slot.
    pub fn shutdown(&self) {
        self.connect_attempts
            .store(self.config.max_connect_attempts.saturating_add(1), Ordering::SeqCst);
        self.reconnector.shutdown();

        let ids: Vec<ThreadId> = self.lock_slots().keys().copied().collect();
        for id in ids {
            self.close_slot(id);
        }
    }

    /// Register the calling thread for slot release on exit.
    ///
    /// Returns `None` if the thread is already tearing down.
    fn enter(self: &Arc<Self>) -> Option<Caller> {
        let holder: Weak<dyn ReleaseSlot> = Arc::<Self>::downgrade(self);
        CALLER_EXIT
            .try_with(|exit| {
                exit.register(holder);
                exit.caller.clone()
            })
            .ok()
    }

    fn open_slot(self: &Arc<Self>, caller: &Caller) {
        let max = self.config.max_connect_attempts;
        if caller.has_exited() || self.connect_attempts.load(Ordering::SeqCst) > max {
            return;
        }

        match self.connector.connect(&self.peer, &self.config) {
            Ok(channel) => {
                let mut slots = self.lock_slots();
                if caller.has_exited() {
                    drop(slots);
                    self.close_channel(channel);
                    return;
                }
                let slot = slots.entry(caller.id).or_default();
                slot.state = ConnectionState::Connected;
                let previous = slot.channel.replace(channel);
                drop(slots);

                if let Some(previous) = previous {
                    self.close_channel(previous);
                }
                self.connect_attempts.store(1, Ordering::SeqCst);
                self.lock_stats().record_connect();
                info!(peer = %self.peer, "Connected to [{}]", self.peer);
            }
            Err(e) => {
                let _ = self
                    .connect_attempts
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                        (n <= max).then(|| n.saturating_add(1))
                    });
                self.lock_stats().record_failure();
                warn!(
                    peer = %self.peer,
                    error = %e,
                    "Error opening connection to: [{}], [{}]",
                    self.peer,
                    e
                );
                self.reconnect(caller);
            }
        }
    }

    /// Schedule a delayed close-then-open of the caller's slot in the background.
    fn reconnect(self: &Arc<Self>, caller: &Caller) {
        self.set_state(caller, ConnectionState::Reconnecting);

        let holder = Arc::downgrade(self);
        let task_caller = caller.clone();
        let scheduled = self.reconnector.schedule(&self.peer.to_string(), move || {
            if let Some(holder) = holder.upgrade() {
                holder.close_slot(task_caller.id);
                holder.open_slot(&task_caller);
            }
        });

        if scheduled {
            self.lock_stats().record_reconnect();
        } else {
            self.set_state(caller, ConnectionState::Failed);
        }
    }

    fn close_slot(&self, id: ThreadId) {
        let channel = self
            .lock_slots()
            .remove(&id)
            .and_then(|slot| slot.channel);
        if let Some(channel) = channel {
            self.close_channel(channel);
            self.lock_stats().record_disconnect();
        }
    }

    fn close_channel(&self, mut channel: C::Channel) {
        if channel.is_closed() {
            return;
        }
        if let Err(e) = channel.close() {
            warn!(peer = %self.peer, error = %e, "Error closing connection to: [{}]", e);
        }
    }

    fn set_state(&self, caller: &Caller, state: ConnectionState) {
        let mut slots = self.lock_slots();
        if !caller.has_exited() {
            slots.entry(caller.id).or_default().state = state;
        }
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<ThreadId, Slot<C::Channel>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_stats(&self) -> MutexGuard<'_, ConnectionStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Connector> ReleaseSlot for ConnectionHolder<C> {
    fn release_slot(&self, id: ThreadId) {
        self.close_slot(id);
    }
}

impl<C: Connector> Drop for ConnectionHolder<C> {
    fn drop(&mut self) {
        self.reconnector.shutdown();
    }
}

impl<C: Connector> std::fmt::Debug for ConnectionHolder<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHolder")
            .field("peer", &self.peer)
            .field("connect_attempts", &self.connect_attempts())
            .finish()
    }
}
