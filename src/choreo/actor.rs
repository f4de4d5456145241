use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
    animation::mainloop::{RenderId, TweenOpts},
    choreo::{
        css,
        engine::Ctx,
        stage::Stage,
        style::{Element, format_number, get_style_value, get_unit, parse_number, set_style_prop},
        transform::{TRANSFORM, is_transform_prop, parse_transform},
    },
    foundation::config::RenderMode,
    signal::promise::{ObserverId, Promise, Status, when_all},
};

/// One entry of an actor's settlement value.
#[derive(Clone, Debug, PartialEq)]
pub struct ActorResult {
    /// The animated element; `None` for stage-level results.
    pub target: Option<Element>,
    /// `false` when the actor was canceled or removed.
    pub succ: bool,
}

/// Promise settled when an actor, group or stage finishes.
pub type ActorPromise = Promise<Vec<ActorResult>>;

/// What to animate: one style property of one element.
#[derive(Clone, Debug, PartialEq)]
pub struct ActorOpts {
    pub target: Element,
    pub prop: String,
    pub to: String,
    /// Start value; read from the element when `None`.
    pub from: Option<String>,
    /// Milliseconds.
    pub duration: f64,
    /// Easing name; linear when `None` or unknown.
    pub easing: Option<String>,
    /// Milliseconds before the motion starts.
    pub delay: f64,
}

impl ActorOpts {
    pub fn new(target: &Element, prop: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            target: target.clone(),
            prop: prop.into(),
            to: to.into(),
            from: None,
            duration: 0.0,
            easing: None,
            delay: 0.0,
        }
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn duration(mut self, ms: f64) -> Self {
        self.duration = ms;
        self
    }

    pub fn easing(mut self, name: impl Into<String>) -> Self {
        self.easing = Some(name.into());
        self
    }

    pub fn delay(mut self, ms: f64) -> Self {
        self.delay = ms;
        self
    }
}

/// Mutable playback state behind an actor.
pub(crate) struct OptState {
    pub(crate) opts: ActorOpts,
    pub(crate) promise: ActorPromise,
    pub(crate) current_from: Option<String>,
    pub(crate) start_time: Option<f64>,
    /// A CSS transition waits for its target value to be written.
    pub(crate) runtimer: bool,
    pub(crate) cached: bool,
    pub(crate) render: Option<RenderId>,
    pub(crate) watcher: Option<ObserverId>,
}

pub(crate) type OptRef = Rc<RefCell<OptState>>;

impl OptState {
    pub(crate) fn new_ref(opts: ActorOpts, promise: ActorPromise) -> OptRef {
        Rc::new(RefCell::new(Self {
            opts,
            promise,
            current_from: None,
            start_time: None,
            runtimer: false,
            cached: false,
            render: None,
            watcher: None,
        }))
    }

    /// Forget playback state, keeping options and promise.
    fn detach(&mut self) {
        self.current_from = None;
        self.start_time = None;
        self.runtimer = false;
        self.cached = false;
        self.render = None;
        self.watcher = None;
    }
}

pub(crate) enum ActorKind {
    Single(OptRef),
    Group {
        members: Vec<Actor>,
        promise: ActorPromise,
    },
}

pub(crate) struct ActorInner {
    pub(crate) kind: ActorKind,
    pub(crate) stage: Option<Stage>,
}

/// Handle to a running (or detached) animation: a single property or a group.
///
/// Groups come from multi-property calls, transform values and [`Stage::group`]; their
/// promise resolves once every member resolved and rejects as soon as one rejects.
#[derive(Clone)]
pub struct Actor {
    inner: Rc<RefCell<ActorInner>>,
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let mut d = f.debug_struct("Actor");
        match &inner.kind {
            ActorKind::Single(opt) => d.field("opts", &opt.borrow().opts),
            ActorKind::Group { members, .. } => d.field("members", &members.len()),
        };
        d.field("stage", &inner.stage.as_ref().map(Stage::name)).finish()
    }
}

impl Actor {
    pub(crate) fn single(opt: OptRef, stage: Option<Stage>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ActorInner {
                kind: ActorKind::Single(opt),
                stage,
            })),
        }
    }

    /// Join `members` under one promise that disables itself after settling.
    pub(crate) fn group(members: Vec<Actor>, stage: Option<Stage>) -> Self {
        let follows: Vec<ActorPromise> = members.iter().map(Actor::follow).collect();
        let promise = when_all(&follows);
        let weak = promise.downgrade();
        promise.bind(move |_, _| {
            if let Some(p) = weak.upgrade() {
                p.disable();
            }
        });
        Self {
            inner: Rc::new(RefCell::new(ActorInner {
                kind: ActorKind::Group { members, promise },
                stage,
            })),
        }
    }

    /// Settles when the actor finishes (`succ: true`) or is canceled (`succ: false`).
    pub fn follow(&self) -> ActorPromise {
        match &self.inner.borrow().kind {
            ActorKind::Single(opt) => opt.borrow().promise.clone(),
            ActorKind::Group { promise, .. } => promise.clone(),
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        self.inner.borrow().stage.clone()
    }

    pub fn is_group(&self) -> bool {
        matches!(self.inner.borrow().kind, ActorKind::Group { .. })
    }

    pub fn members(&self) -> Vec<Actor> {
        match &self.inner.borrow().kind {
            ActorKind::Single(_) => Vec::new(),
            ActorKind::Group { members, .. } => members.clone(),
        }
    }

    /// Options of a single actor; `None` for groups.
    pub fn opts(&self) -> Option<ActorOpts> {
        match &self.inner.borrow().kind {
            ActorKind::Single(opt) => Some(opt.borrow().opts.clone()),
            ActorKind::Group { .. } => None,
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn opt_ref(&self) -> Option<OptRef> {
        match &self.inner.borrow().kind {
            ActorKind::Single(opt) => Some(Rc::clone(opt)),
            ActorKind::Group { .. } => None,
        }
    }

    /// Retarget to `value` and restart the stage.
    ///
    /// An unfinished stage is canceled first and played again if it was playing. On a
    /// transform group `value` is a transform list; on other groups every member gets it.
    /// An empty value keeps the current target.
    pub fn setto(&self, value: &str) -> &Self {
        self.retarget(value, |_, v| v.filter(|v| !v.is_empty()).map(str::to_string))
    }

    /// Retarget by adding `delta` to the current target, keeping units (`10px` + `5` is
    /// `15px`). Works like [`Actor::setto`] otherwise.
    pub fn extendto(&self, delta: &str) -> &Self {
        self.retarget(delta, |opts, v| {
            let v = v.filter(|v| !v.is_empty())?;
            let unit = get_unit(&opts.to, v);
            let sum = parse_number(&opts.to).unwrap_or(0.0) + parse_number(v).unwrap_or(0.0);
            Some(format!("{}{unit}", format_number(sum)))
        })
    }

    /// Retarget to where the last run started.
    pub fn reverse(&self) -> &Self {
        let stage = self.stage();
        let restart = self.cancel_stage(stage.as_ref());
        self.for_each_opt(&mut |opt| {
            let mut o = opt.borrow_mut();
            if let Some(back) = o.opts.from.clone().or_else(|| o.current_from.clone()) {
                o.opts.to = back;
            }
        });
        if let (true, Some(stage)) = (restart, stage) {
            stage.play();
        }
        self
    }

    fn retarget(&self, value: &str, f: impl Fn(&ActorOpts, Option<&str>) -> Option<String>) -> &Self {
        let stage = self.stage();
        let restart = self.cancel_stage(stage.as_ref());
        let by_prop = match &self.inner.borrow().kind {
            ActorKind::Group { members, .. }
                if members
                    .first()
                    .and_then(Actor::opts)
                    .is_some_and(|o| is_transform_prop(&o.prop)) =>
            {
                Some(parse_transform(value))
            }
            _ => None,
        };
        self.for_each_opt(&mut |opt| {
            let mut o = opt.borrow_mut();
            let v = match &by_prop {
                Some(lib) => lib.iter().find(|(k, _)| *k == o.opts.prop).map(|(_, v)| v.as_str()),
                None => Some(value),
            };
            if let Some(to) = f(&o.opts, v) {
                o.opts.to = to;
            }
        });
        if let (true, Some(stage)) = (restart, stage) {
            stage.play();
        }
        self
    }

    fn cancel_stage(&self, stage: Option<&Stage>) -> bool {
        match stage {
            Some(stage) if !stage.is_completed() => {
                let playing = stage.is_playing();
                stage.cancel();
                playing
            }
            _ => false,
        }
    }

    fn for_each_opt(&self, f: &mut dyn FnMut(&OptRef)) {
        match &self.inner.borrow().kind {
            ActorKind::Single(opt) => f(opt),
            ActorKind::Group { members, .. } => {
                for m in members {
                    m.for_each_opt(f);
                }
            }
        }
    }

    /// Detached copy with the same options and a fresh promise.
    pub fn fork(&self) -> Actor {
        match &self.inner.borrow().kind {
            ActorKind::Single(opt) => {
                let opts = opt.borrow().opts.clone();
                Actor::single(OptState::new_ref(opts, ActorPromise::new()), None)
            }
            ActorKind::Group { members, .. } => {
                Actor::group(members.iter().map(Actor::fork).collect(), None)
            }
        }
    }

    /// Leave the stage: stop the motion, reject the promise with `succ: false`, then re-arm
    /// the promise so it can settle again after [`Actor::enter`].
    pub fn exit(&self) -> &Self {
        let Some(stage) = self.inner.borrow_mut().stage.take() else {
            return self;
        };
        match self.opt_ref() {
            Some(opt) => {
                stage.detach_opt(&opt);
                let (promise, watcher, target) = {
                    let o = opt.borrow();
                    (o.promise.clone(), o.watcher, o.opts.target.clone())
                };
                promise
                    .reject(vec![ActorResult {
                        target: Some(target),
                        succ: false,
                    }])
                    .disable();
                if let Some(id) = watcher {
                    promise.unbind(id);
                }
                opt.borrow_mut().detach();
                promise.reset().enable();
            }
            None => {
                for member in self.members() {
                    member.exit();
                }
                self.follow().reset().enable();
            }
        }
        tracing::debug!(stage = stage.name(), "actor exit");
        self
    }

    /// Move onto `stage`, leaving the current one first.
    ///
    /// Followers of the old promise keep being notified when the new one settles.
    pub fn enter(&self, stage: &Stage) -> &Self {
        if self.stage().is_some() {
            self.exit();
        }
        let old = self.follow();
        let entered = match self.opt_ref() {
            Some(opt) => stage.actor_ref(opt),
            None => {
                let members = self.members();
                let transform_group = members
                    .first()
                    .and_then(Actor::opts)
                    .is_some_and(|o| is_transform_prop(&o.prop));
                if transform_group {
                    stage.actor(transform_opts(&members))
                } else {
                    let opts = members.iter().filter_map(Actor::opt_ref).collect();
                    stage.actor_refs(opts)
                }
            }
        };
        let new = entered.follow();
        if !new.ptr_eq(&old) {
            new.bind(move |status, value| match status {
                Status::Resolved => {
                    old.resolve(value.clone());
                }
                Status::Rejected => {
                    old.reject(value.clone());
                }
                Status::Pending => {}
            });
        }
        std::mem::swap(&mut *self.inner.borrow_mut(), &mut *entered.inner.borrow_mut());
        self
    }
}

/// Rebuild the transform actor a transform group was split from.
fn transform_opts(members: &[Actor]) -> ActorOpts {
    let parts: Vec<ActorOpts> = members.iter().filter_map(Actor::opts).collect();
    let to = parts
        .iter()
        .map(|o| format!("{}({})", o.prop, o.to))
        .collect::<Vec<_>>()
        .join(" ");
    let mut opts = parts[0].clone();
    opts.prop = TRANSFORM.to_string();
    opts.to = to;
    opts.from = None;
    opts
}

/// Tween `opt` on the scheduler stage `name`.
pub(crate) fn render_opt(ctx: &Rc<Ctx>, name: &str, opt: &OptRef) {
    let (elm, prop, to, from, duration, easing, delay, promise) = {
        let o = opt.borrow();
        (
            o.opts.target.clone(),
            o.opts.prop.clone(),
            o.opts.to.clone(),
            o.opts.from.clone(),
            o.opts.duration,
            o.opts.easing.clone(),
            o.opts.delay,
            o.promise.clone(),
        )
    };
    let end = parse_number(&to).unwrap_or(0.0);
    let mut from = from.unwrap_or_else(|| get_style_value(&elm, &prop));
    let unit = get_unit(&from, &to);
    if !unit.is_empty() && !from.contains(unit.as_str()) {
        from = "0".to_string();
    }
    let current = parse_number(&from).unwrap_or(0.0);
    opt.borrow_mut().current_from = Some(from);

    let step_elm = elm.clone();
    let weak = Rc::downgrade(ctx);
    let mut tween = TweenOpts::new(move |v, _| {
        set_style_prop(&step_elm, &prop, &format!("{}{unit}", format_number(v)));
    })
    .delay(delay)
    .callback(move || {
        let Some(ctx) = weak.upgrade() else {
            return;
        };
        ctx.defer(move || {
            promise
                .resolve(vec![ActorResult {
                    target: Some(elm),
                    succ: true,
                }])
                .disable();
        });
    });
    tween.easing = easing;
    let id = ctx
        .mainloop
        .borrow_mut()
        .add_tween(name, current, end, duration, tween);
    opt.borrow_mut().render = Some(id);
}

/// Start `opt` on `stage` with the stage's strategy.
pub(crate) fn start(ctx: &Rc<Ctx>, stage: &Stage, opt: &OptRef) {
    match stage.mode() {
        RenderMode::Css => {
            if stage.is_playing() {
                css::play(ctx, opt);
            }
        }
        RenderMode::Js => render_opt(ctx, stage.name(), opt),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/choreo/actor.rs"]
mod tests;
