#![forbid(unsafe_code)]
//! AMD-style module kernel and a stage/actor animation engine.
//!
//! - [`Loader`] resolves `define`/`require` graphs leaves-first, fetching remote scripts once
//!   per url through a [`ScriptSource`].
//! - [`Mainloop`] drives named stages of render callbacks and tweens from one [`Clock`].
//! - [`Choreo`] animates [`Element`] styles through stages of actors, either as CSS
//!   transitions or as scheduler tweens.
//!
//! Everything is single-threaded and advances only through explicit turns
//! ([`Loader::run_until_idle`], [`Mainloop::tick`], [`Choreo::tick`]).

mod animation;
mod choreo;
mod foundation;
mod module;
mod signal;

pub use animation::ease::{Ease, EaseFn, EasingTable};
pub use animation::mainloop::{
    DEFAULT_INTERVAL, Flow, FrameCtx, LONG_AFTER, Mainloop, Render, RenderId, StageInfo, TweenOpts,
};
pub use choreo::actor::{Actor, ActorOpts, ActorPromise, ActorResult};
pub use choreo::engine::Choreo;
pub use choreo::stage::Stage;
pub use choreo::style::{
    CssValue, Element, TRANSITION, format_number, get_unit, parse_number, unit_of,
};
pub use choreo::transform::{
    TRANSFORM, TRANSFORM_DEFAULT, TransformKind, get as get_transform, is_transform_prop,
    parse_transform, set as set_transform, transform_kind,
};
pub use foundation::clock::{Clock, ManualClock, SystemClock};
pub use foundation::config::{ChoreoConfig, LoaderConfig, RenderMode, SchedulerConfig};
pub use foundation::error::{OzError, OzResult};
pub use module::loader::Loader;
pub use module::naming::{BUILTIN_DEPS, RESET_PLUGIN};
pub use module::record::{
    Arg, Factory, FactoryCall, FactoryFn, Finish, LoadState, ModuleDef, ModuleInfo, ModuleRecord,
    RequireCallback,
};
pub use module::registry::Registry;
pub use module::source::{Delivery, DirSource, MemorySource, ModuleDoc, ScriptDoc, ScriptSource};
pub use signal::promise::{ObserverId, Promise, Status, WeakPromise, when_all};
