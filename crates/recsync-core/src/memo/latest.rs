use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared};

type SharedResult<T, E> = Shared<LocalBoxFuture<'static, Result<T, E>>>;

struct Dispatch<T, E> {
    token: u64,
    result: SharedResult<T, E>,
}

/// Last-dispatch-wins ordering.
///
/// Every call invokes the wrapped function right away and becomes the
/// latest dispatch. The future handed back to each caller waits for its own
/// request, then follows the latest dispatch until no newer one has been
/// issued, so all outstanding callers settle on the newest request's result
/// no matter which request finishes last.
///
/// Superseded requests are not cancelled; their results are discarded.
pub struct Latest<I, T, E> {
    f: Box<dyn Fn(I) -> LocalBoxFuture<'static, Result<T, E>>>,
    latest: Rc<RefCell<Option<Dispatch<T, E>>>>,
    sequence: Cell<u64>,
}

impl<I, T, E> Latest<I, T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    pub fn new(f: impl Fn(I) -> LocalBoxFuture<'static, Result<T, E>> + 'static) -> Self {
        Self {
            f: Box::new(f),
            latest: Rc::new(RefCell::new(None)),
            sequence: Cell::new(0),
        }
    }

    pub fn call(&self, inputs: I) -> LocalBoxFuture<'static, Result<T, E>> {
        let token = self.sequence.get() + 1;
        self.sequence.set(token);

        let own = (self.f)(inputs).shared();
        *self.latest.borrow_mut() = Some(Dispatch {
            token,
            result: own.clone(),
        });

        let latest = Rc::clone(&self.latest);
        async move {
            let mut outcome = own.await;
            let mut seen = token;
            loop {
                let newer = latest
                    .borrow()
                    .as_ref()
                    .filter(|dispatch| dispatch.token != seen)
                    .map(|dispatch| (dispatch.token, dispatch.result.clone()));
                let Some((token, result)) = newer else {
                    return outcome;
                };
                tracing::debug!(superseded_by = token, "following newer dispatch");
                outcome = result.await;
                seen = token;
            }
        }
        .boxed_local()
    }

    /// Token of the most recent dispatch, zero before the first call.
    #[must_use]
    pub fn latest_token(&self) -> u64 {
        self.sequence.get()
    }
}

impl<I, T, E> fmt::Debug for Latest<I, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Latest")
            .field("sequence", &self.sequence.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use futures::executor::LocalPool;
    use futures::task::LocalSpawnExt;
    use std::collections::HashMap;

    type Gates = Rc<RefCell<HashMap<&'static str, oneshot::Sender<Result<String, String>>>>>;

    fn gated() -> (Gates, Latest<&'static str, String, String>) {
        let gates: Gates = Rc::new(RefCell::new(HashMap::new()));
        let registry = Rc::clone(&gates);
        let latest = Latest::new(move |key: &'static str| {
            let (tx, rx) = oneshot::channel();
            registry.borrow_mut().insert(key, tx);
            async move { rx.await.unwrap_or_else(|_| Err("dropped".to_string())) }.boxed_local()
        });
        (gates, latest)
    }

    fn open(gates: &Gates, key: &str, value: Result<String, String>) {
        let tx = gates.borrow_mut().remove(key).expect("gate registered");
        tx.send(value).expect("receiver alive");
    }

    fn collect(
        pool: &LocalPool,
        fut: LocalBoxFuture<'static, Result<String, String>>,
    ) -> Rc<RefCell<Option<Result<String, String>>>> {
        let slot = Rc::new(RefCell::new(None));
        let out = Rc::clone(&slot);
        pool.spawner()
            .spawn_local(async move {
                *out.borrow_mut() = Some(fut.await);
            })
            .expect("spawn");
        slot
    }

    #[test]
    fn earlier_call_settles_on_later_result_when_it_finishes_last() {
        let mut pool = LocalPool::new();
        let (gates, latest) = gated();

        let a = collect(&pool, latest.call("a"));
        let b = collect(&pool, latest.call("b"));
        pool.run_until_stalled();

        open(&gates, "b", Ok("B".into()));
        pool.run_until_stalled();
        assert_eq!(*b.borrow(), Some(Ok("B".to_string())));
        assert_eq!(*a.borrow(), None);

        open(&gates, "a", Ok("A".into()));
        pool.run_until_stalled();
        assert_eq!(*a.borrow(), Some(Ok("B".to_string())));
    }

    #[test]
    fn earlier_call_finishing_first_waits_for_later_result() {
        let mut pool = LocalPool::new();
        let (gates, latest) = gated();

        let a = collect(&pool, latest.call("a"));
        let b = collect(&pool, latest.call("b"));
        pool.run_until_stalled();

        open(&gates, "a", Ok("A".into()));
        pool.run_until_stalled();
        assert_eq!(*a.borrow(), None);

        open(&gates, "b", Err("b failed".into()));
        pool.run_until_stalled();
        assert_eq!(*a.borrow(), Some(Err("b failed".to_string())));
        assert_eq!(*b.borrow(), Some(Err("b failed".to_string())));
    }

    #[test]
    fn dispatch_issued_while_following_is_also_followed() {
        let mut pool = LocalPool::new();
        let (gates, latest) = gated();

        let a = collect(&pool, latest.call("a"));
        let _b = collect(&pool, latest.call("b"));
        pool.run_until_stalled();
        open(&gates, "a", Ok("A".into()));
        pool.run_until_stalled();

        let c = collect(&pool, latest.call("c"));
        pool.run_until_stalled();
        open(&gates, "b", Ok("B".into()));
        pool.run_until_stalled();
        assert_eq!(*a.borrow(), None);

        open(&gates, "c", Ok("C".into()));
        pool.run_until_stalled();
        assert_eq!(*a.borrow(), Some(Ok("C".to_string())));
        assert_eq!(*c.borrow(), Some(Ok("C".to_string())));
        assert_eq!(latest.latest_token(), 3);
    }

    #[test]
    fn lone_call_resolves_to_its_own_result() {
        let mut pool = LocalPool::new();
        let (gates, latest) = gated();
        let a = collect(&pool, latest.call("a"));
        pool.run_until_stalled();
        open(&gates, "a", Ok("A".into()));
        pool.run_until_stalled();
        assert_eq!(*a.borrow(), Some(Ok("A".to_string())));
    }
}
