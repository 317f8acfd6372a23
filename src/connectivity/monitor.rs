//! Process-wide view of network reachability.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info};

/// Callback invoked with the new status on every transition.
pub type ConnectivityHandler = Arc<dyn Fn(bool) + Send + Sync>;

/// Handle returned by [`ConnectivityMonitor::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Work to start after the monitor observes a transition to online.
pub trait ReconnectHook: Send + Sync {
    fn on_reconnect(&self);
}

/// Tracks the online/offline signal and notifies subscribers on change.
///
/// Construct one per process and share it by `Arc`. Reads never block on a
/// network probe; the status only changes through [`set_online`].
///
/// [`set_online`]: ConnectivityMonitor::set_online
pub struct ConnectivityMonitor {
    online: AtomicBool,
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, ConnectivityHandler)>>,
    reconnect: Mutex<Option<Weak<dyn ReconnectHook>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConnectivityMonitor {
    /// Create a monitor from the environment's initial signal.
    ///
    /// With no signal the monitor assumes online.
    #[must_use]
    pub fn new(signal: Option<bool>) -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(signal.unwrap_or(true)),
            next_id: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
            reconnect: Mutex::new(None),
        })
    }

    /// Current cached status.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Register a handler for future transitions.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.subscribers).push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = lock(&self.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Install the hook run after each transition to online.
    ///
    /// Held weakly: the hook usually owns an `Arc` of this monitor.
    pub fn set_reconnect_hook(&self, hook: Weak<dyn ReconnectHook>) {
        *lock(&self.reconnect) = Some(hook);
    }

    /// Feed an observed environment signal.
    ///
    /// Subscribers run only when the status actually changes, each exactly
    /// once, against a snapshot of the list so a handler may unsubscribe
    /// itself. After a transition to online the reconnect hook runs.
    /// Handlers must not call `set_online` themselves.
    ///
    /// Returns whether this call was a transition.
    pub fn set_online(&self, online: bool) -> bool {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return false;
        }

        info!(online, "connectivity changed");

        let snapshot: Vec<ConnectivityHandler> = lock(&self.subscribers)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in snapshot {
            handler(online);
        }

        if online {
            let hook = lock(&self.reconnect).as_ref().and_then(Weak::upgrade);
            match hook {
                Some(hook) => hook.on_reconnect(),
                None => debug!("no reconnect hook installed"),
            }
        }

        true
    }
}
