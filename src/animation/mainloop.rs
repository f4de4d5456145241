use std::{
    collections::{HashMap, VecDeque},
    fmt,
    rc::Rc,
    time::Duration,
};

use crate::{
    animation::ease::{EaseFn, EasingTable},
    foundation::{
        clock::{Clock, SystemClock},
        config::SchedulerConfig,
    },
};

/// Timestamp `complete` renders at, far past the end of any tween.
pub const LONG_AFTER: f64 = 4_000_000_000_000.0;

/// Interval of the timer fallback loop driven by [`Mainloop::drive`].
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(15);

/// Handle of one render callback inside a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderId(u64);

/// What a render sees on each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameCtx {
    /// Logical frame time; [`LONG_AFTER`] while completing a stage.
    pub timestamp: f64,
    /// Clock time at the frame.
    pub now: f64,
    /// When the stage was last paused, `0` if never.
    pub pause_time: f64,
}

/// Whether a render stays in its stage after a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Done,
}

/// Per-frame callback of a stage.
pub trait Render {
    fn render(&mut self, frame: &FrameCtx) -> Flow;
}

impl<F> Render for F
where
    F: FnMut(&FrameCtx) -> Flow,
{
    fn render(&mut self, frame: &FrameCtx) -> Flow {
        self(frame)
    }
}

type StepFn = Box<dyn FnMut(f64, f64)>;
type Callback = Box<dyn FnOnce()>;

/// Options of [`Mainloop::add_tween`].
pub struct TweenOpts {
    /// Name in the scheduler's easing table; linear when `None` or unknown.
    pub easing: Option<String>,
    /// Milliseconds before the tween starts.
    pub delay: f64,
    /// Called with `(value, elapsed_ms)`.
    pub step: StepFn,
    /// Called once after the final step.
    pub callback: Option<Callback>,
}

impl TweenOpts {
    pub fn new(step: impl FnMut(f64, f64) + 'static) -> Self {
        Self {
            easing: None,
            delay: 0.0,
            step: Box::new(step),
            callback: None,
        }
    }

    pub fn easing(mut self, name: impl Into<String>) -> Self {
        self.easing = Some(name.into());
        self
    }

    pub fn delay(mut self, ms: f64) -> Self {
        self.delay = ms;
        self
    }

    pub fn callback(mut self, f: impl FnOnce() + 'static) -> Self {
        self.callback = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for TweenOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenOpts")
            .field("easing", &self.easing)
            .field("delay", &self.delay)
            .field("callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

struct Tween {
    from: f64,
    to: f64,
    duration: f64,
    easing: Option<EaseFn>,
    step: StepFn,
    callback: Option<Callback>,
    start: f64,
    last_pause: f64,
}

impl Render for Tween {
    fn render(&mut self, frame: &FrameCtx) -> Flow {
        // first frame after a resume: push the start past the paused interval
        if self.last_pause != frame.pause_time && self.start < frame.pause_time {
            self.last_pause = frame.pause_time;
            self.start += frame.now - self.last_pause;
        }
        let time = frame.timestamp - self.start;
        if time <= 0.0 {
            return Flow::Continue;
        }
        if time >= self.duration {
            (self.step)(self.to, self.duration);
            if let Some(callback) = self.callback.take() {
                callback();
            }
            return Flow::Done;
        }
        let mut p = time / self.duration;
        if let Some(ease) = &self.easing {
            p = ease(p);
        }
        (self.step)(self.from + (self.to - self.from) * p, time);
        Flow::Continue
    }
}

struct DelayTimer {
    remaining: f64,
    armed_at: f64,
    armed: bool,
    tween: Tween,
}

impl DelayTimer {
    fn due(&self, now: f64) -> bool {
        self.armed && now - self.armed_at >= self.remaining
    }
}

struct Stage {
    running: bool,
    last_loop: f64,
    pause_time: f64,
    renders: Vec<(RenderId, Box<dyn Render>)>,
    delays: Vec<(RenderId, DelayTimer)>,
}

impl Stage {
    fn new() -> Self {
        Self {
            running: false,
            last_loop: 0.0,
            pause_time: 0.0,
            renders: Vec::new(),
            delays: Vec::new(),
        }
    }
}

/// Snapshot of a stage returned by [`Mainloop::info`].
#[derive(Clone, Debug, PartialEq)]
pub struct StageInfo {
    pub name: String,
    pub running: bool,
    pub last_loop: f64,
    pub pause_time: f64,
    pub renders: usize,
    pub delayed: usize,
}

/// Frame scheduler: named stages of render callbacks driven by one clock.
///
/// Nothing happens between calls to [`Mainloop::tick`]. Each tick fires due delay timers,
/// runs deferred callbacks, then renders every running stage whose frame interval elapsed.
pub struct Mainloop {
    clock: Rc<dyn Clock>,
    config: SchedulerConfig,
    easing: EasingTable,
    stages: HashMap<String, Stage>,
    active: Vec<String>,
    global: bool,
    next_id: u64,
    deferred: VecDeque<Callback>,
}

impl fmt::Debug for Mainloop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mainloop")
            .field("config", &self.config)
            .field("active", &self.active)
            .field("global", &self.global)
            .field("stages", &self.stages.len())
            .finish_non_exhaustive()
    }
}

impl Default for Mainloop {
    fn default() -> Self {
        Self::new(Rc::new(SystemClock::new()))
    }
}

impl Mainloop {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            config: SchedulerConfig::default(),
            easing: EasingTable::default(),
            stages: HashMap::new(),
            active: Vec::new(),
            global: false,
            next_id: 1,
            deferred: VecDeque::new(),
        }
    }

    pub fn config(&mut self, config: SchedulerConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn now(&self) -> f64 {
        self.clock.now_ms()
    }

    pub fn easing(&self) -> &EasingTable {
        &self.easing
    }

    pub fn easing_mut(&mut self) -> &mut EasingTable {
        &mut self.easing
    }

    /// Register a named easing function for tweens.
    pub fn add_easing(&mut self, name: impl Into<String>, f: impl Fn(f64) -> f64 + 'static) -> &mut Self {
        self.easing.add(name, f);
        self
    }

    /// Create `name` if it does not exist yet.
    pub fn add_stage(&mut self, name: &str) -> &mut Self {
        self.stages
            .entry(name.to_string())
            .or_insert_with(Stage::new);
        self
    }

    fn next_render_id(&mut self) -> RenderId {
        let id = RenderId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a render to `name`, creating the stage when needed.
    pub fn add_render(&mut self, name: &str, render: impl Render + 'static) -> RenderId {
        let id = self.next_render_id();
        self.push_render(name, id, Box::new(render));
        id
    }

    fn push_render(&mut self, name: &str, id: RenderId, render: Box<dyn Render>) {
        self.stages
            .entry(name.to_string())
            .or_insert_with(Stage::new)
            .renders
            .push((id, render));
    }

    /// Tween `from -> to` over `duration` ms.
    ///
    /// `step(from, 0)` is called when the tween starts (after its delay), `step(v, elapsed)`
    /// on each frame, and `step(to, duration)` followed by the callback once the duration
    /// elapsed, after which the render leaves the stage. A zero duration calls
    /// `step(to, 0)` and defers the callback to the next tick.
    pub fn add_tween(&mut self, name: &str, from: f64, to: f64, duration: f64, opts: TweenOpts) -> RenderId {
        let easing = match opts.easing.as_deref() {
            Some(n) => {
                let f = self.easing.get(n);
                if f.is_none() {
                    tracing::warn!(easing = n, "unknown easing, falling back to linear");
                }
                f
            }
            None => None,
        };
        let tween = Tween {
            from,
            to,
            duration: duration.max(0.0),
            easing,
            step: opts.step,
            callback: opts.callback,
            start: 0.0,
            last_pause: 0.0,
        };
        let id = self.next_render_id();
        if opts.delay > 0.0 {
            let now = self.now();
            self.add_stage(name);
            if let Some(stage) = self.stages.get_mut(name) {
                stage.delays.push((
                    id,
                    DelayTimer {
                        remaining: opts.delay,
                        armed_at: now,
                        armed: true,
                        tween,
                    },
                ));
            }
        } else {
            self.start_tween(name, id, tween);
        }
        id
    }

    fn start_tween(&mut self, name: &str, id: RenderId, mut tween: Tween) {
        if tween.duration <= 0.0 {
            (tween.step)(tween.to, 0.0);
            if let Some(callback) = tween.callback.take() {
                self.deferred.push_back(callback);
            }
            return;
        }
        (tween.step)(tween.from, 0.0);
        tween.start = self.now();
        self.push_render(name, id, Box::new(tween));
    }

    /// Activate `name` (creating it when needed) and turn the global loop on.
    pub fn run(&mut self, name: &str) -> &mut Self {
        let now = self.now();
        let stage = self
            .stages
            .entry(name.to_string())
            .or_insert_with(Stage::new);
        if !stage.running {
            stage.running = true;
            for (_, timer) in &mut stage.delays {
                timer.armed_at = now;
                timer.armed = true;
            }
            self.active.push(name.to_string());
            tracing::debug!(stage = name, "stage running");
        }
        self.global = true;
        self
    }

    /// Turn the global loop on without touching stage states.
    pub fn start(&mut self) -> &mut Self {
        self.global = true;
        self
    }

    /// Turn the global loop off. Stage states and timers are kept.
    pub fn stop(&mut self) -> &mut Self {
        self.global = false;
        self
    }

    /// Deactivate `name`, freezing its delay timers.
    pub fn pause(&mut self, name: &str) -> &mut Self {
        let now = self.now();
        let Some(stage) = self.stages.get_mut(name) else {
            return self;
        };
        if !stage.running {
            return self;
        }
        stage.running = false;
        stage.pause_time = now;
        for (_, timer) in &mut stage.delays {
            if timer.armed {
                timer.remaining -= now - timer.armed_at;
                timer.armed = false;
            }
        }
        self.active.retain(|n| n != name);
        tracing::debug!(stage = name, "stage paused");
        self
    }

    /// Start every delayed render of `name`, render everything at [`LONG_AFTER`], then
    /// remove the stage.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn complete(&mut self, name: &str) -> &mut Self {
        let Some(stage) = self.stages.get_mut(name) else {
            return self;
        };
        let delays = std::mem::take(&mut stage.delays);
        for (id, timer) in delays {
            self.start_tween(name, id, timer.tween);
        }
        let now = self.now();
        if let Some(stage) = self.stages.get_mut(name) {
            let frame = FrameCtx {
                timestamp: LONG_AFTER,
                now,
                pause_time: stage.pause_time,
            };
            for (_, render) in &mut stage.renders {
                render.render(&frame);
            }
        }
        self.remove(name)
    }

    /// Pause and drop `name` with all its renders and timers.
    pub fn remove(&mut self, name: &str) -> &mut Self {
        self.pause(name);
        self.stages.remove(name);
        self
    }

    /// Drop one render (or its pending delay timer) from `name`.
    pub fn remove_render(&mut self, name: &str, id: RenderId) -> &mut Self {
        if let Some(stage) = self.stages.get_mut(name) {
            stage.renders.retain(|(rid, _)| *rid != id);
            stage.delays.retain(|(rid, _)| *rid != id);
        }
        self
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.stages.get(name).is_some_and(|s| s.running)
    }

    pub fn has_stage(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    pub fn info(&self, name: &str) -> Option<StageInfo> {
        self.stages.get(name).map(|s| StageInfo {
            name: name.to_string(),
            running: s.running,
            last_loop: s.last_loop,
            pause_time: s.pause_time,
            renders: s.renders.len(),
            delayed: s.delays.len(),
        })
    }

    /// Run one frame at the clock's current time.
    pub fn tick(&mut self) {
        let now = self.now();
        self.fire_timers(now);

        while let Some(callback) = self.deferred.pop_front() {
            callback();
        }

        if !self.global {
            return;
        }
        let interval = self.config.frame_interval_ms();
        for name in self.active.clone() {
            let Some(stage) = self.stages.get_mut(&name) else {
                continue;
            };
            if now - stage.last_loop < interval {
                continue;
            }
            stage.last_loop = now;
            let frame = FrameCtx {
                timestamp: now,
                now,
                pause_time: stage.pause_time,
            };
            stage
                .renders
                .retain_mut(|(_, render)| render.render(&frame) == Flow::Continue);
        }
    }

    fn fire_timers(&mut self, now: f64) {
        let mut due = Vec::new();
        for (name, stage) in &mut self.stages {
            let mut i = 0;
            while i < stage.delays.len() {
                if stage.delays[i].1.due(now) {
                    let (id, timer) = stage.delays.remove(i);
                    due.push((name.clone(), id, timer.tween));
                } else {
                    i += 1;
                }
            }
        }
        for (name, id, tween) in due {
            self.start_tween(&name, id, tween);
        }
    }

    /// Whether another tick could change anything.
    pub fn is_idle(&self) -> bool {
        if !self.deferred.is_empty() {
            return false;
        }
        self.stages.values().all(|s| {
            s.delays.iter().all(|(_, t)| !t.armed)
                && (!self.global || !s.running || s.renders.is_empty())
        })
    }

    /// Timer fallback loop: tick every `interval` of real time until idle.
    pub fn drive(&mut self, interval: Duration) -> usize {
        let mut frames = 0;
        loop {
            self.tick();
            frames += 1;
            if self.is_idle() {
                return frames;
            }
            std::thread::sleep(interval);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/mainloop.rs"]
mod tests;
