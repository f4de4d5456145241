use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use crate::{
    choreo::{
        actor::{self, Actor, ActorOpts, ActorPromise, ActorResult, OptRef, OptState},
        css,
        engine::Ctx,
        style::Element,
        transform::{TRANSFORM, parse_transform},
    },
    foundation::config::RenderMode,
    signal::promise::{Status, WeakPromise},
};

pub(crate) struct StageInner {
    name: String,
    mode: RenderMode,
    ctx: Weak<Ctx>,
    /// Actors added and not yet settled.
    count: Cell<i64>,
    /// Every single actor added by the embedder, replayed by `play` after completion.
    opt_cache: RefCell<Vec<OptRef>>,
    running: RefCell<Vec<OptRef>>,
    playing: Cell<bool>,
    promise: ActorPromise,
    /// Group promises re-armed when the stage replays; dropped groups are pruned.
    groups: RefCell<Vec<WeakPromise<Vec<ActorResult>>>>,
    end_timer: Cell<Option<u64>>,
}

/// Named group of actors played, paused and completed together.
///
/// A stage's promise settles once all of its actors settled: resolved when the last one
/// finished, rejected when it was canceled. Playing a completed stage replays every actor
/// it has seen.
#[derive(Clone)]
pub struct Stage {
    inner: Rc<StageInner>,
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.inner.name)
            .field("mode", &self.inner.mode)
            .field("count", &self.inner.count.get())
            .field("actors", &self.inner.opt_cache.borrow().len())
            .finish()
    }
}

enum EndAction {
    Stop,
    Complete,
    Settle,
}

impl Stage {
    pub(crate) fn new(name: String, mode: RenderMode, ctx: Weak<Ctx>) -> Self {
        let stage = Self {
            inner: Rc::new(StageInner {
                name,
                mode,
                ctx,
                count: Cell::new(0),
                opt_cache: RefCell::new(Vec::new()),
                running: RefCell::new(Vec::new()),
                playing: Cell::new(false),
                promise: ActorPromise::new(),
                groups: RefCell::new(Vec::new()),
                end_timer: Cell::new(None),
            }),
        };
        tracing::debug!(stage = %stage.inner.name, mode = mode.as_str(), "stage created");
        stage
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn mode(&self) -> RenderMode {
        self.inner.mode
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn ctx(&self) -> Option<Rc<Ctx>> {
        self.inner.ctx.upgrade()
    }

    pub fn is_playing(&self) -> bool {
        match self.inner.mode {
            RenderMode::Css => self.inner.playing.get(),
            RenderMode::Js => self
                .ctx()
                .is_some_and(|ctx| ctx.mainloop.borrow().is_running(&self.inner.name)),
        }
    }

    /// No actor is left unsettled.
    pub fn is_completed(&self) -> bool {
        self.inner.count.get() <= 0
    }

    /// Settles when every actor of the stage settled.
    pub fn follow(&self) -> ActorPromise {
        self.inner.promise.clone()
    }

    /// Number of actors added and not settled yet.
    pub fn pending(&self) -> i64 {
        self.inner.count.get()
    }

    /// Start or resume. A completed stage first re-arms its promises and replays every
    /// cached actor.
    pub fn play(&self) -> &Self {
        let Some(ctx) = self.ctx() else {
            return self;
        };
        if self.is_completed() {
            self.inner.end_timer.set(None);
            self.fire_reset();
            let cache = self.inner.opt_cache.borrow().clone();
            for opt in &cache {
                self.add_opt(&ctx, opt);
            }
            self.settle_transforms(&ctx, &cache);
        }
        match self.inner.mode {
            RenderMode::Css => {
                if !self.inner.playing.get() {
                    self.inner.playing.set(true);
                    let running = self.inner.running.borrow().clone();
                    for opt in &running {
                        css::play(&ctx, opt);
                    }
                    css::settle_transforms(&ctx, &running);
                }
            }
            RenderMode::Js => {
                ctx.mainloop.borrow_mut().run(&self.inner.name);
            }
        }
        tracing::debug!(stage = %self.inner.name, "stage play");
        self
    }

    /// Freeze every actor where it is.
    pub fn pause(&self) -> &Self {
        let Some(ctx) = self.ctx() else {
            return self;
        };
        match self.inner.mode {
            RenderMode::Css => {
                self.inner.playing.set(false);
                let running = self.inner.running.borrow().clone();
                for opt in &running {
                    css::stop(&ctx, opt);
                }
            }
            RenderMode::Js => {
                ctx.mainloop.borrow_mut().pause(&self.inner.name);
            }
        }
        self
    }

    /// Stop every actor and reject every pending actor promise.
    pub fn cancel(&self) -> &Self {
        let Some(ctx) = self.ctx() else {
            return self;
        };
        self.to_end(&ctx, EndAction::Stop);
        let cache = self.inner.opt_cache.borrow().clone();
        for opt in cache {
            let (promise, target) = {
                let o = opt.borrow();
                (o.promise.clone(), o.opts.target.clone())
            };
            promise
                .reject(vec![ActorResult {
                    target: Some(target),
                    succ: false,
                }])
                .disable();
        }
        tracing::debug!(stage = %self.inner.name, "stage cancel");
        self
    }

    /// Cancel, then forget every cached actor so `play` has nothing to replay.
    pub fn clear(&self) -> &Self {
        self.cancel();
        let cache = std::mem::take(&mut *self.inner.opt_cache.borrow_mut());
        for opt in cache {
            opt.borrow_mut().cached = false;
        }
        self
    }

    /// Jump every actor to its target value and settle it.
    pub fn complete(&self) -> &Self {
        let Some(ctx) = self.ctx() else {
            return self;
        };
        self.to_end(&ctx, EndAction::Complete);
        ctx.run_tasks();
        self
    }

    /// Add one actor; it starts right away when the stage is playing.
    ///
    /// A `transform` actor is split into one sub-actor per transform function and returned
    /// as a group.
    pub fn actor(&self, opts: ActorOpts) -> Actor {
        self.actor_ref(OptState::new_ref(opts, ActorPromise::new()))
    }

    /// Animate several properties of `target` with shared timing.
    ///
    /// One property gives a single actor, more give a group.
    pub fn actor_props(
        &self,
        target: &Element,
        props: &[(&str, &str)],
        duration: f64,
        easing: Option<&str>,
        delay: f64,
    ) -> Actor {
        let mut actors: Vec<Actor> = props
            .iter()
            .map(|(prop, to)| {
                let opts = ActorOpts {
                    target: target.clone(),
                    prop: (*prop).to_string(),
                    to: (*to).to_string(),
                    from: None,
                    duration,
                    easing: easing.map(str::to_string),
                    delay,
                };
                self.actor_ref(OptState::new_ref(opts, ActorPromise::new()))
            })
            .collect();
        if actors.len() == 1 {
            return actors.remove(0);
        }
        self.grouped(actors)
    }

    /// Add several actors as one group.
    pub fn actors(&self, list: Vec<ActorOpts>) -> Actor {
        let opts = list
            .into_iter()
            .map(|o| OptState::new_ref(o, ActorPromise::new()))
            .collect();
        self.actor_refs(opts)
    }

    /// Group actors already on this stage; actors of other stages are left out.
    pub fn group(&self, actors: &[Actor]) -> Actor {
        let members = actors
            .iter()
            .filter(|a| a.stage().is_some_and(|s| s.ptr_eq(self)))
            .cloned()
            .collect();
        self.grouped(members)
    }

    pub(crate) fn actor_refs(&self, opts: Vec<OptRef>) -> Actor {
        let actors = opts
            .into_iter()
            .map(|opt| self.actor_ref(opt))
            .collect();
        self.grouped(actors)
    }

    fn grouped(&self, members: Vec<Actor>) -> Actor {
        let group = Actor::group(members, Some(self.clone()));
        let mut groups = self.inner.groups.borrow_mut();
        groups.retain(|p| p.upgrade().is_some());
        groups.push(group.follow().downgrade());
        group
    }

    pub(crate) fn actor_ref(&self, opt: OptRef) -> Actor {
        let Some(ctx) = self.ctx() else {
            return Actor::single(opt, Some(self.clone()));
        };
        let opts = opt.borrow().opts.clone();
        if opts.prop == TRANSFORM {
            return self.split_transform(&ctx, opts);
        }
        let actor = self.add_opt(&ctx, &opt);
        self.settle_transforms(&ctx, &[opt]);
        actor
    }

    /// One sub-actor per transform function. In CSS mode they share one promise, settled by
    /// the element's `transform` end.
    fn split_transform(&self, ctx: &Rc<Ctx>, opts: ActorOpts) -> Actor {
        let shared = match self.inner.mode {
            RenderMode::Css => Some(ActorPromise::new()),
            RenderMode::Js => None,
        };
        let from = opts.from.as_deref().map(parse_transform).unwrap_or_default();
        let subs: Vec<OptRef> = parse_transform(&opts.to)
            .into_iter()
            .map(|(prop, to)| {
                let sub = ActorOpts {
                    from: from.iter().find(|(k, _)| *k == prop).map(|(_, v)| v.clone()),
                    prop,
                    to,
                    ..opts.clone()
                };
                OptState::new_ref(sub, shared.clone().unwrap_or_default())
            })
            .collect();
        let members = subs.iter().map(|opt| self.add_opt(ctx, opt)).collect();
        self.settle_transforms(ctx, &subs);
        self.grouped(members)
    }

    /// Settle transform splits that had nothing left to animate once played.
    fn settle_transforms(&self, ctx: &Ctx, opts: &[OptRef]) {
        if self.inner.mode == RenderMode::Css && self.inner.playing.get() {
            css::settle_transforms(ctx, opts);
        }
    }

    fn add_opt(&self, ctx: &Rc<Ctx>, opt: &OptRef) -> Actor {
        self.inner.end_timer.set(None);
        let promise = opt.borrow().promise.clone();
        promise.reset().enable();

        self.inner.count.set(self.inner.count.get() + 1);
        if self.inner.mode == RenderMode::Css {
            let mut running = self.inner.running.borrow_mut();
            if !running.iter().any(|o| Rc::ptr_eq(o, opt)) {
                running.push(Rc::clone(opt));
            }
        }
        actor::start(ctx, self, opt);
        let handle = Actor::single(Rc::clone(opt), Some(self.clone()));

        let cached = std::mem::replace(&mut opt.borrow_mut().cached, true);
        if !cached {
            self.inner.opt_cache.borrow_mut().push(Rc::clone(opt));
            let weak = Rc::downgrade(&self.inner);
            let id = promise.bind(move |status, _| {
                if let Some(inner) = weak.upgrade() {
                    Stage { inner }.actor_settled(status == Status::Resolved);
                }
            });
            opt.borrow_mut().watcher = Some(id);
        }
        handle
    }

    fn actor_settled(&self, succ: bool) {
        let count = self.inner.count.get() - 1;
        self.inner.count.set(count);
        if count > 0 {
            return;
        }
        let Some(ctx) = self.ctx() else {
            return;
        };
        let id = ctx.next_task_id();
        self.inner.end_timer.set(Some(id));
        let weak = Rc::downgrade(&self.inner);
        ctx.defer(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.end_timer.get() != Some(id) {
                return;
            }
            inner.end_timer.set(None);
            let stage = Stage { inner };
            if let Some(ctx) = stage.ctx() {
                stage.to_end(&ctx, EndAction::Settle);
            }
            let result = vec![ActorResult { target: None, succ }];
            tracing::debug!(stage = %stage.inner.name, succ, "stage end");
            if succ {
                stage.inner.promise.resolve(result);
            } else {
                stage.inner.promise.reject(result);
            }
        });
    }

    fn fire_reset(&self) {
        self.inner.promise.reset();
        let live: Vec<_> = {
            let mut groups = self.inner.groups.borrow_mut();
            groups.retain(|p| p.upgrade().is_some());
            groups.iter().filter_map(WeakPromise::upgrade).collect()
        };
        for promise in live {
            promise.reset().enable();
        }
    }

    fn to_end(&self, ctx: &Rc<Ctx>, action: EndAction) {
        match self.inner.mode {
            RenderMode::Css => {
                if !self.inner.playing.get() {
                    return;
                }
                self.inner.playing.set(false);
                let running = std::mem::take(&mut *self.inner.running.borrow_mut());
                for opt in &running {
                    match action {
                        EndAction::Stop => css::stop(ctx, opt),
                        EndAction::Complete => {
                            css::complete(ctx, opt);
                            let (promise, target) = {
                                let o = opt.borrow();
                                (o.promise.clone(), o.opts.target.clone())
                            };
                            promise
                                .resolve(vec![ActorResult {
                                    target: Some(target),
                                    succ: true,
                                }])
                                .disable();
                        }
                        EndAction::Settle => {}
                    }
                }
            }
            RenderMode::Js => match action {
                EndAction::Stop => {
                    ctx.mainloop.borrow_mut().remove(&self.inner.name);
                }
                EndAction::Complete => {
                    ctx.mainloop.borrow_mut().complete(&self.inner.name);
                }
                EndAction::Settle => {}
            },
        }
    }

    /// Take `opt` off this stage without settling it.
    pub(crate) fn detach_opt(&self, opt: &OptRef) {
        if let Some(ctx) = self.ctx() {
            match self.inner.mode {
                RenderMode::Css => {
                    self.inner.running.borrow_mut().retain(|o| !Rc::ptr_eq(o, opt));
                    if self.is_playing() {
                        css::stop(&ctx, opt);
                    }
                }
                RenderMode::Js => {
                    let render = opt.borrow().render;
                    if let Some(id) = render {
                        ctx.mainloop.borrow_mut().remove_render(&self.inner.name, id);
                    }
                }
            }
        }
        self.inner.opt_cache.borrow_mut().retain(|o| !Rc::ptr_eq(o, opt));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/choreo/stage.rs"]
mod tests;
