use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::clock::Clock;

/// One remembered call. Owned by exactly one [`Memoize`].
#[derive(Debug, Clone)]
pub struct CacheEntry<I, R> {
    pub inputs: I,
    pub result: R,
    pub timestamp: i64,
}

/// Time-boxed memoizer.
///
/// Results younger than the expiration window are returned without calling
/// the wrapped function. Whatever the function returns is cached as-is, so
/// wrapping a function that returns a [`futures::future::Shared`] future lets
/// concurrent identical calls await one in-flight request.
///
/// Expired entries are pruned whenever a new entry is inserted.
pub struct Memoize<I, R> {
    f: Box<dyn Fn(&I) -> R>,
    entries: RefCell<Vec<CacheEntry<I, R>>>,
    clock: Rc<dyn Clock>,
    expiration_ms: i64,
}

impl<I, R> Memoize<I, R>
where
    I: PartialEq,
    R: Clone,
{
    pub fn new(f: impl Fn(&I) -> R + 'static, clock: Rc<dyn Clock>, expiration_ms: i64) -> Self {
        Self {
            f: Box::new(f),
            entries: RefCell::new(Vec::new()),
            clock,
            expiration_ms,
        }
    }

    pub fn call(&self, inputs: I) -> R {
        let now = self.clock.now_millis();
        if let Some(hit) = self.lookup(&inputs, now) {
            tracing::trace!("memoized result reused");
            return hit;
        }

        tracing::trace!(window_ms = self.expiration_ms, "memo miss");
        // The borrow is released while `f` runs so it may re-enter.
        let result = (self.f)(&inputs);

        let mut entries = self.entries.borrow_mut();
        entries.retain(|entry| self.is_live(entry, now));
        entries.push(CacheEntry {
            inputs,
            result: result.clone(),
            timestamp: now,
        });
        result
    }

    fn lookup(&self, inputs: &I, now: i64) -> Option<R> {
        self.entries
            .borrow()
            .iter()
            .find(|entry| self.is_live(entry, now) && entry.inputs == *inputs)
            .map(|entry| entry.result.clone())
    }

    const fn is_live(&self, entry: &CacheEntry<I, R>, now: i64) -> bool {
        now - entry.timestamp < self.expiration_ms
    }

    /// Number of retained entries, live or not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<I, R> fmt::Debug for Memoize<I, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoize")
            .field("entries", &self.entries.borrow().len())
            .field("expiration_ms", &self.expiration_ms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use futures::FutureExt;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use futures::future::{LocalBoxFuture, Shared};
    use std::cell::Cell;

    fn counting(clock: &Rc<ManualClock>) -> (Rc<Cell<usize>>, Memoize<(String, u32), String>) {
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let memo = Memoize::new(
            move |(name, n): &(String, u32)| {
                seen.set(seen.get() + 1);
                format!("{name}-{n}")
            },
            Rc::clone(clock) as Rc<dyn Clock>,
            5000,
        );
        (calls, memo)
    }

    #[test]
    fn equal_inputs_within_window_hit_the_cache() {
        let clock = Rc::new(ManualClock::starting_at(0));
        let (calls, memo) = counting(&clock);

        assert_eq!(memo.call(("a".into(), 1)), "a-1");
        clock.advance(4999);
        assert_eq!(memo.call(("a".into(), 1)), "a-1");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn distinct_inputs_are_cached_side_by_side() {
        let clock = Rc::new(ManualClock::starting_at(0));
        let (calls, memo) = counting(&clock);

        memo.call(("a".into(), 1));
        memo.call(("b".into(), 1));
        memo.call(("a".into(), 1));
        memo.call(("b".into(), 1));
        assert_eq!(calls.get(), 2);
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn expired_entries_are_recomputed_and_pruned() {
        let clock = Rc::new(ManualClock::starting_at(0));
        let (calls, memo) = counting(&clock);

        memo.call(("a".into(), 1));
        memo.call(("b".into(), 2));
        clock.advance(5000);
        memo.call(("a".into(), 1));
        assert_eq!(calls.get(), 3);
        // Both stale entries were dropped when the fresh one went in.
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn pending_futures_are_shared_between_callers() {
        let clock = Rc::new(ManualClock::starting_at(0));
        let (tx, rx) = oneshot::channel::<u32>();
        let rx = RefCell::new(Some(rx));
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);

        let memo: Memoize<u32, Shared<LocalBoxFuture<'static, u32>>> = Memoize::new(
            move |_: &u32| {
                seen.set(seen.get() + 1);
                let rx = rx.borrow_mut().take().expect("dispatched once");
                async move { rx.await.unwrap_or(0) }.boxed_local().shared()
            },
            clock as Rc<dyn Clock>,
            5000,
        );

        let first = memo.call(7);
        let second = memo.call(7);
        tx.send(42).expect("send");
        assert_eq!(block_on(first), 42);
        assert_eq!(block_on(second), 42);
        assert_eq!(calls.get(), 1);
    }
}
