use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

/// Settlement state of a [`Promise`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Not settled yet (or reset).
    Pending,
    /// Resolved with a value.
    Resolved,
    /// Rejected with a value.
    Rejected,
}

/// Handle returned by [`Promise::bind`], used to unbind the observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type OnceHandler<T> = Box<dyn FnOnce(&T)>;
type Observer<T> = Rc<dyn Fn(Status, &T)>;

struct Inner<T> {
    status: Status,
    value: Option<T>,
    done: Vec<OnceHandler<T>>,
    fail: Vec<OnceHandler<T>>,
    observers: Vec<(ObserverId, Observer<T>)>,
    disabled: bool,
    next_observer: u64,
}

/// Single-threaded, resettable completion object.
///
/// `done`/`fail` handlers run once; observers added with `bind` run on every settlement and
/// survive [`Promise::reset`]. A disabled promise ignores `resolve`/`reject` until it is
/// enabled again. Handlers are invoked with no internal borrow held, so they may freely call
/// back into the same promise.
pub struct Promise<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Promise")
            .field("status", &inner.status)
            .field("disabled", &inner.disabled)
            .field("done", &inner.done.len())
            .field("fail", &inner.fail.len())
            .field("observers", &inner.observers.len())
            .finish()
    }
}

/// Weak counterpart of [`Promise`].
pub struct WeakPromise<T> {
    inner: Weak<RefCell<Inner<T>>>,
}

impl<T> Clone for WeakPromise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakPromise<T> {
    pub fn upgrade(&self) -> Option<Promise<T>> {
        self.inner.upgrade().map(|inner| Promise { inner })
    }
}

impl<T: Clone + 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Promise<T> {
    /// Create a pending, enabled promise.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                status: Status::Pending,
                value: None,
                done: Vec::new(),
                fail: Vec::new(),
                observers: Vec::new(),
                disabled: false,
                next_observer: 1,
            })),
        }
    }

    /// Current status.
    pub fn status(&self) -> Status {
        self.inner.borrow().status
    }

    /// Settled value, if any.
    pub fn value(&self) -> Option<T> {
        self.inner.borrow().value.clone()
    }

    /// Whether settlement is currently ignored.
    pub fn is_disabled(&self) -> bool {
        self.inner.borrow().disabled
    }

    /// Whether both handles point at the same promise.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Non-owning handle, for observers that refer back to their own promise.
    pub fn downgrade(&self) -> WeakPromise<T> {
        WeakPromise {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Run `f` once on resolution (immediately if already resolved).
    pub fn done(&self, f: impl FnOnce(&T) + 'static) -> &Self {
        let ready = {
            let mut inner = self.inner.borrow_mut();
            match inner.status {
                Status::Resolved => inner.value.clone(),
                Status::Pending => {
                    inner.done.push(Box::new(f));
                    return self;
                }
                Status::Rejected => return self,
            }
        };
        if let Some(v) = ready {
            f(&v);
        }
        self
    }

    /// Run `f` once on rejection (immediately if already rejected).
    pub fn fail(&self, f: impl FnOnce(&T) + 'static) -> &Self {
        let ready = {
            let mut inner = self.inner.borrow_mut();
            match inner.status {
                Status::Rejected => inner.value.clone(),
                Status::Pending => {
                    inner.fail.push(Box::new(f));
                    return self;
                }
                Status::Resolved => return self,
            }
        };
        if let Some(v) = ready {
            f(&v);
        }
        self
    }

    /// `done` and `fail` in one call.
    pub fn then(
        &self,
        on_done: impl FnOnce(&T) + 'static,
        on_fail: impl FnOnce(&T) + 'static,
    ) -> &Self {
        self.done(on_done);
        self.fail(on_fail)
    }

    /// Observe every settlement. Called right away when already settled.
    pub fn bind(&self, f: impl Fn(Status, &T) + 'static) -> ObserverId {
        let observer: Observer<T> = Rc::new(f);
        let (id, ready) = {
            let mut inner = self.inner.borrow_mut();
            let id = ObserverId(inner.next_observer);
            inner.next_observer += 1;
            inner.observers.push((id, Rc::clone(&observer)));
            let ready = match inner.status {
                Status::Pending => None,
                status => inner.value.clone().map(|v| (status, v)),
            };
            (id, ready)
        };
        if let Some((status, v)) = ready {
            observer(status, &v);
        }
        id
    }

    /// Drop an observer added with [`Promise::bind`].
    pub fn unbind(&self, id: ObserverId) -> &Self {
        self.inner.borrow_mut().observers.retain(|(oid, _)| *oid != id);
        self
    }

    /// Settle successfully. Ignored while disabled.
    pub fn resolve(&self, value: T) -> &Self {
        self.settle(Status::Resolved, value)
    }

    /// Settle with failure. Ignored while disabled.
    pub fn reject(&self, value: T) -> &Self {
        self.settle(Status::Rejected, value)
    }

    /// Return to pending and drop queued once-handlers; observers are kept.
    pub fn reset(&self) -> &Self {
        let mut inner = self.inner.borrow_mut();
        inner.status = Status::Pending;
        inner.value = None;
        inner.done.clear();
        inner.fail.clear();
        self
    }

    /// Ignore settlements until [`Promise::enable`].
    pub fn disable(&self) -> &Self {
        self.inner.borrow_mut().disabled = true;
        self
    }

    /// Accept settlements again.
    pub fn enable(&self) -> &Self {
        self.inner.borrow_mut().disabled = false;
        self
    }

    fn settle(&self, status: Status, value: T) -> &Self {
        let (handlers, observers) = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            if inner.disabled {
                return self;
            }
            inner.status = status;
            inner.value = Some(value.clone());
            let run = if status == Status::Resolved {
                inner.fail.clear();
                std::mem::take(&mut inner.done)
            } else {
                inner.done.clear();
                std::mem::take(&mut inner.fail)
            };
            let observers: Vec<Observer<T>> =
                inner.observers.iter().map(|(_, o)| Rc::clone(o)).collect();
            (run, observers)
        };
        for observer in observers {
            observer(status, &value);
        }
        for handler in handlers {
            handler(&value);
        }
        self
    }
}

/// Join promises that settle with lists.
///
/// The joined promise resolves with the members' values concatenated in member order once
/// every member has resolved, and rejects as soon as any member rejects. After firing it
/// re-arms, so members that are reset and settle again fire the join again. An empty member
/// list resolves immediately with an empty list.
pub fn when_all<T: Clone + 'static>(members: &[Promise<Vec<T>>]) -> Promise<Vec<T>> {
    let joined = Promise::new();
    if members.is_empty() {
        joined.resolve(Vec::new());
        return joined;
    }

    let slots: Rc<RefCell<Vec<Option<Vec<T>>>>> = Rc::new(RefCell::new(vec![None; members.len()]));
    for (i, member) in members.iter().enumerate() {
        let slots = Rc::clone(&slots);
        let joined = joined.clone();
        member.bind(move |status, value| match status {
            Status::Resolved => {
                let complete = {
                    let mut slots = slots.borrow_mut();
                    if slots[i].is_some() {
                        return;
                    }
                    slots[i] = Some(value.clone());
                    if slots.iter().all(Option::is_some) {
                        let out: Vec<T> = slots.iter_mut().filter_map(Option::take).flatten().collect();
                        Some(out)
                    } else {
                        None
                    }
                };
                if let Some(out) = complete {
                    joined.resolve(out);
                }
            }
            Status::Rejected => {
                slots.borrow_mut().iter_mut().for_each(|s| *s = None);
                joined.reject(value.clone());
            }
            Status::Pending => {}
        });
    }
    joined
}

#[cfg(test)]
#[path = "../../tests/unit/signal/promise.rs"]
mod tests;
