//! Observable value container.
//!
//! A [`Reactive`] holds one value and notifies two kinds of observers on
//! every write:
//! - synchronous subscribers registered with [`Reactive::subscribe`], run on
//!   the writing task right after the value is stored;
//! - async observers holding a [`tokio::sync::watch::Receiver`] from
//!   [`Reactive::watch`].
//!
//! Cloning a `Reactive` yields another handle to the same value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`Reactive::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Inner<T> {
    tx: watch::Sender<T>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber<T>)>>,
    next_id: AtomicU64,
}

pub struct Reactive<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Reactive<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Reactive<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Reactive").field(&*self.inner.tx.borrow()).finish()
    }
}

impl<T> Reactive<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(value: T) -> Self {
        let (tx, _rx) = watch::channel(value);
        Self {
            inner: Arc::new(Inner {
                tx,
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.inner.tx.borrow().clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.tx.borrow())
    }

    /// Replace the value and notify every observer.
    pub fn set(&self, value: T) {
        self.inner.tx.send_replace(value);
        self.notify();
    }

    /// Mutate the value in place and notify every observer.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.inner.tx.send_modify(f);
        self.notify();
    }

    /// Register a synchronous subscriber.
    ///
    /// The callback is not invoked for the current value, only for writes
    /// made after registration.
    pub fn subscribe(&self, f: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(f)));
        id
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Receiver for async observers.
    pub fn watch(&self) -> watch::Receiver<T> {
        self.inner.tx.subscribe()
    }

    /// A handle that can observe but not write.
    pub fn readable(&self) -> Readable<T> {
        Readable(self.clone())
    }

    fn notify(&self) {
        // Subscribers may write to other reactives (or this one), so neither
        // the list lock nor the value borrow is held while they run.
        let subscribers: Vec<Subscriber<T>> = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();
        if subscribers.is_empty() {
            return;
        }

        let current = self.get();
        for subscriber in subscribers {
            subscriber(&current);
        }
    }
}

impl<T> Default for Reactive<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Read-only view of a [`Reactive`], handed to consumers of published state.
pub struct Readable<T>(Reactive<T>);

impl<T> Clone for Readable<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Readable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<T> Readable<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn get(&self) -> T {
        self.0.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.with(f)
    }

    pub fn subscribe(&self, f: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        self.0.subscribe(f)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.0.unsubscribe(id)
    }

    pub fn watch(&self) -> watch::Receiver<T> {
        self.0.watch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let value = Reactive::new(1);
        value.set(2);
        assert_eq!(value.get(), 2);

        value.update(|v| *v += 40);
        assert_eq!(value.get(), 42);
    }

    #[test]
    fn test_subscribers_see_every_write() {
        let value = Reactive::new(String::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        value.subscribe(move |v: &String| sink.lock().unwrap().push(v.clone()));

        value.set("a".to_string());
        value.update(|v| v.push('b'));

        assert_eq!(*seen.lock().unwrap(), vec!["a", "ab"]);
    }

    #[test]
    fn test_subscribe_does_not_fire_for_current_value() {
        let value = Reactive::new(7);
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        value.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let value = Reactive::new(0);
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let id = value.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        value.set(1);
        assert!(value.unsubscribe(id));
        assert!(!value.unsubscribe(id));
        value.set(2);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscriber_can_write_other_reactive() {
        let source = Reactive::new(0);
        let mirror = Reactive::new(0);

        let target = mirror.clone();
        source.subscribe(move |v| target.set(*v * 10));
        source.set(3);

        assert_eq!(mirror.get(), 30);
    }

    #[test]
    fn test_readable_follows_source() {
        let value = Reactive::new(vec![1]);
        let view = value.readable();
        value.update(|v| v.push(2));
        assert_eq!(view.get(), vec![1, 2]);
        assert_eq!(view.with(|v| v.len()), 2);
    }

    #[tokio::test]
    async fn test_watch_receiver_observes_change() {
        let value = Reactive::new(0);
        let mut rx = value.watch();

        value.set(5);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 5);
    }
}
