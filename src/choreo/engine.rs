use std::{
    cell::{Cell, Ref, RefCell},
    collections::{HashMap, VecDeque},
    fmt,
    rc::Rc,
};

use crate::{
    animation::mainloop::Mainloop,
    choreo::{css::FxTable, stage::Stage, style::Element},
    foundation::{
        clock::{Clock, SystemClock},
        config::{ChoreoConfig, RenderMode},
    },
};

type Task = Box<dyn FnOnce()>;

/// State shared by the engine handle and every stage it created.
pub(crate) struct Ctx {
    pub(crate) clock: Rc<dyn Clock>,
    pub(crate) mainloop: RefCell<Mainloop>,
    pub(crate) fx: RefCell<FxTable>,
    mode: Cell<RenderMode>,
    stages: RefCell<HashMap<String, Stage>>,
    next_stage: Cell<u64>,
    tasks: RefCell<VecDeque<Task>>,
    next_task: Cell<u64>,
}

impl Ctx {
    pub(crate) fn now(&self) -> f64 {
        self.clock.now_ms()
    }

    pub(crate) fn mode(&self) -> RenderMode {
        self.mode.get()
    }

    /// Queue `task` for the next [`Choreo::tick`].
    pub(crate) fn defer(&self, task: impl FnOnce() + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    pub(crate) fn next_task_id(&self) -> u64 {
        let id = self.next_task.get();
        self.next_task.set(id + 1);
        id
    }

    /// Run queued tasks, including ones they queue, until none are left.
    pub(crate) fn run_tasks(&self) {
        loop {
            let task = self.tasks.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }

    pub(crate) fn has_tasks(&self) -> bool {
        !self.tasks.borrow().is_empty()
    }

    pub(crate) fn timing_value(&self, easing: Option<&str>) -> String {
        self.mainloop.borrow().easing().timing_value(easing).to_string()
    }

    pub(crate) fn ease(&self, easing: Option<&str>, t: f64) -> f64 {
        self.mainloop.borrow().easing().ease(easing, t)
    }
}

/// The transition engine: stages of actors animating [`Element`] styles.
///
/// In [`RenderMode::Css`] actors write target values under a `transition` declaration and
/// finish on transition ends, reported through [`Choreo::transition_end`] or synthesized by
/// [`Choreo::tick`]. In [`RenderMode::Js`] they run as scheduler tweens. Either way nothing
/// moves between ticks.
///
/// ```
/// use std::rc::Rc;
/// use ozkit::{Choreo, ChoreoConfig, Element, ManualClock};
///
/// let clock = ManualClock::new(0.0);
/// let choreo = Choreo::new(Rc::new(clock.clone()), ChoreoConfig::default());
/// let box_ = Element::new("box").with_style("left", "0px");
/// let stage = choreo.stage(Some("intro"));
/// stage.actor_props(&box_, &[("left", "100px")], 1000.0, None, 0.0);
/// stage.play();
/// clock.set(500.0);
/// choreo.tick();
/// assert_eq!(box_.style("left").as_deref(), Some("50px"));
/// ```
#[derive(Clone)]
pub struct Choreo {
    ctx: Rc<Ctx>,
}

impl fmt::Debug for Choreo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Choreo")
            .field("render_mode", &self.ctx.mode())
            .field("stages", &self.ctx.stages.borrow().len())
            .field("tasks", &self.ctx.tasks.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Default for Choreo {
    fn default() -> Self {
        Self::new(Rc::new(SystemClock::new()), ChoreoConfig::default())
    }
}

impl Choreo {
    pub fn new(clock: Rc<dyn Clock>, config: ChoreoConfig) -> Self {
        let mainloop = Mainloop::new(Rc::clone(&clock));
        let choreo = Self {
            ctx: Rc::new(Ctx {
                clock,
                mainloop: RefCell::new(mainloop),
                fx: RefCell::new(FxTable::default()),
                mode: Cell::new(RenderMode::default()),
                stages: RefCell::new(HashMap::new()),
                next_stage: Cell::new(0),
                tasks: RefCell::new(VecDeque::new()),
                next_task: Cell::new(1),
            }),
        };
        choreo.config(config);
        choreo
    }

    /// Apply `config`: extra timing values, scheduler options and the render mode.
    ///
    /// The render mode only affects stages created afterwards.
    pub fn config(&self, config: ChoreoConfig) -> &Self {
        let mut mainloop = self.ctx.mainloop.borrow_mut();
        for (name, value) in config.timing_values {
            mainloop.easing_mut().add_value(name, value);
        }
        mainloop.config(config.scheduler);
        if let Some(mode) = config.render_mode {
            self.ctx.mode.set(mode);
            tracing::debug!(mode = mode.as_str(), "render mode");
        }
        self
    }

    /// Register an easing function and, optionally, its CSS timing value.
    pub fn add_easing(
        &self,
        name: &str,
        f: impl Fn(f64) -> f64 + 'static,
        timing_value: Option<&str>,
    ) -> &Self {
        let mut mainloop = self.ctx.mainloop.borrow_mut();
        mainloop.add_easing(name, f);
        if let Some(css) = timing_value {
            mainloop.easing_mut().add_value(name, css);
        }
        self
    }

    pub fn render_mode(&self) -> RenderMode {
        self.ctx.mode()
    }

    pub fn now(&self) -> f64 {
        self.ctx.now()
    }

    /// Scheduler running the JS-mode tweens.
    pub fn mainloop(&self) -> Ref<'_, Mainloop> {
        self.ctx.mainloop.borrow()
    }

    /// The stage called `name`, created on first use. `None` creates a fresh anonymous
    /// stage named `_oz_choreo_N`.
    pub fn stage(&self, name: Option<&str>) -> Stage {
        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => {
                let n = self.ctx.next_stage.get();
                self.ctx.next_stage.set(n + 1);
                format!("_oz_choreo_{n}")
            }
        };
        if let Some(stage) = self.ctx.stages.borrow().get(&name) {
            return stage.clone();
        }
        let mode = self.ctx.mode();
        if mode == RenderMode::Js {
            self.ctx.mainloop.borrow_mut().add_stage(&name);
        }
        let stage = Stage::new(name.clone(), mode, Rc::downgrade(&self.ctx));
        self.ctx.stages.borrow_mut().insert(name, stage.clone());
        stage
    }

    /// Advance everything to the clock's current time.
    ///
    /// Runs queued work, renders one scheduler frame, synthesizes transition ends for CSS
    /// transitions whose time is up, then runs the work those completions queued.
    pub fn tick(&self) {
        self.ctx.run_tasks();
        self.ctx.mainloop.borrow_mut().tick();
        let now = self.ctx.now();
        let ended = self.ctx.fx.borrow().due(now);
        for (elm, prop) in ended {
            self.transition_end(&elm, &prop);
        }
        self.ctx.run_tasks();
    }

    /// Report that the CSS transition of `property` on `elm` ended.
    pub fn transition_end(&self, elm: &Element, property: &str) {
        crate::choreo::css::transition_end(&self.ctx, elm, property);
    }

    /// Whether another tick could change anything.
    pub fn is_idle(&self) -> bool {
        !self.ctx.has_tasks() && self.ctx.mainloop.borrow().is_idle() && self.ctx.fx.borrow().is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/choreo/engine.rs"]
mod tests;
