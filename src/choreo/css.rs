use std::{collections::HashMap, rc::Rc};

use crate::{
    choreo::{
        actor::{ActorPromise, ActorResult, OptRef},
        engine::Ctx,
        style::{
            Element, TRANSITION, format_number, get_style_value, get_unit, parse_number,
            set_style_prop,
        },
        transform::{TRANSFORM, is_transform_prop},
    },
    signal::promise::Status,
};

/// Per-element transition sets, keyed by the id stamped on the element on first use.
#[derive(Default)]
pub(crate) struct FxTable {
    last_id: u64,
    sets: HashMap<u64, Vec<(String, OptRef)>>,
    transform_promises: HashMap<u64, Vec<ActorPromise>>,
}

impl FxTable {
    pub(crate) fn hash(&mut self, elm: &Element) -> u64 {
        let id = match elm.fx_id() {
            Some(id) => id,
            None => {
                self.last_id += 1;
                elm.stamp_fx(self.last_id);
                self.last_id
            }
        };
        self.sets.entry(id).or_default();
        id
    }

    fn get(&self, hash: u64, prop: &str) -> Option<&OptRef> {
        self.sets
            .get(&hash)?
            .iter()
            .find(|(p, _)| p == prop)
            .map(|(_, opt)| opt)
    }

    fn insert(&mut self, hash: u64, prop: &str, opt: OptRef) {
        let set = self.sets.entry(hash).or_default();
        match set.iter_mut().find(|(p, _)| p == prop) {
            Some(slot) => slot.1 = opt,
            None => set.push((prop.to_string(), opt)),
        }
    }

    fn remove(&mut self, hash: u64, prop: &str) -> Option<OptRef> {
        let set = self.sets.get_mut(&hash)?;
        let i = set.iter().position(|(p, _)| p == prop)?;
        Some(set.remove(i).1)
    }

    fn has_transform(&self, hash: u64) -> bool {
        self.sets
            .get(&hash)
            .is_some_and(|set| set.iter().any(|(p, _)| is_transform_prop(p)))
    }

    /// Remember `promise` as settled by the next `transform` end of the element.
    fn register_transform(&mut self, hash: u64, promise: &ActorPromise) {
        let list = self.transform_promises.entry(hash).or_default();
        if !list.iter().any(|p| p.ptr_eq(promise)) {
            list.push(promise.clone());
        }
    }

    /// Forget the registered transform promises once no transform function is in flight.
    fn prune_transforms(&mut self, hash: u64) {
        if !self.has_transform(hash) {
            self.transform_promises.remove(&hash);
        }
    }

    /// Whether a transition in flight on the element settles `promise`.
    fn carries(&self, hash: u64, promise: &ActorPromise) -> bool {
        self.sets
            .get(&hash)
            .is_some_and(|set| set.iter().any(|(_, opt)| opt.borrow().promise.ptr_eq(promise)))
    }

    /// Whether no transition is in flight.
    pub(crate) fn is_empty(&self) -> bool {
        self.sets.values().all(Vec::is_empty)
    }

    /// Transitions whose time is up at `now`, as `(element, property)` ends to report.
    ///
    /// Transform functions are reported together as one `transform` end once all of them
    /// are due.
    pub(crate) fn due(&self, now: f64) -> Vec<(Element, String)> {
        let mut ended = Vec::new();
        for set in self.sets.values() {
            let mut transform: Option<(Element, bool)> = None;
            for (prop, opt) in set {
                let o = opt.borrow();
                let due = !o.runtimer && o.start_time.is_some_and(|s| now >= s + o.opts.duration);
                if is_transform_prop(prop) {
                    let all = transform.as_ref().is_none_or(|(_, all)| *all);
                    transform = Some((o.opts.target.clone(), all && due));
                } else if due {
                    ended.push((o.opts.target.clone(), prop.clone()));
                }
            }
            if let Some((elm, true)) = transform {
                ended.push((elm, TRANSFORM.to_string()));
            }
        }
        ended
    }
}

/// `prop duration timing delay` for every transition in flight on the element, comma-joined.
fn transition_str(ctx: &Ctx, hash: u64) -> String {
    let fx = ctx.fx.borrow();
    let Some(set) = fx.sets.get(&hash) else {
        return String::new();
    };
    set.iter()
        .map(|(prop, opt)| {
            let o = opt.borrow();
            let name = if is_transform_prop(prop) { TRANSFORM } else { prop.as_str() };
            format!(
                "{name} {}ms {} {}ms",
                format_number(o.opts.duration),
                ctx.timing_value(o.opts.easing.as_deref()),
                format_number(o.opts.delay)
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn done_result(elm: &Element) -> Vec<ActorResult> {
    vec![ActorResult {
        target: Some(elm.clone()),
        succ: true,
    }]
}

/// Start the transition of `opt`: write the start value now, the target value and the
/// transition declaration on the next turn.
pub(crate) fn play(ctx: &Rc<Ctx>, opt: &OptRef) {
    let (elm, prop, to, from, promise) = {
        let o = opt.borrow();
        (
            o.opts.target.clone(),
            o.opts.prop.clone(),
            o.opts.to.clone(),
            o.opts.from.clone(),
            o.promise.clone(),
        )
    };
    let hash = ctx.fx.borrow_mut().hash(&elm);
    let from = from.unwrap_or_else(|| get_style_value(&elm, &prop));
    if from == to {
        ctx.fx.borrow_mut().remove(hash, &prop);
        // transform functions share a promise; see `settle_transforms`
        if !is_transform_prop(&prop) {
            promise.resolve(done_result(&elm)).disable();
        }
        return;
    }
    {
        let mut o = opt.borrow_mut();
        o.current_from = Some(from.clone());
        o.start_time = Some(ctx.now() + o.opts.delay);
        o.runtimer = true;
    }
    {
        let mut fx = ctx.fx.borrow_mut();
        fx.insert(hash, &prop, Rc::clone(opt));
        if is_transform_prop(&prop) {
            fx.register_transform(hash, &promise);
        }
    }
    set_style_prop(&elm, &prop, &from);
    let transition = transition_str(ctx, hash);
    let opt = Rc::clone(opt);
    ctx.defer(move || {
        if !std::mem::take(&mut opt.borrow_mut().runtimer) {
            return;
        }
        elm.set_style(TRANSITION, transition);
        set_style_prop(&elm, &prop, &to);
    });
}

/// Freeze `opt` at its current eased position and drop it from the transition.
pub(crate) fn stop(ctx: &Ctx, opt: &OptRef) {
    let (elm, prop, to, from, easing, duration, start_time) = {
        let o = opt.borrow();
        (
            o.opts.target.clone(),
            o.opts.prop.clone(),
            o.opts.to.clone(),
            o.current_from.clone().or_else(|| o.opts.from.clone()),
            o.opts.easing.clone(),
            o.opts.duration,
            o.start_time,
        )
    };
    let from = from.unwrap_or_default();
    let start = parse_number(&from).unwrap_or(0.0);
    let end = parse_number(&to).unwrap_or(0.0);
    let time = start_time.map_or(0.0, |s| (ctx.now() - s).max(0.0));
    let mut progress = time / if duration > 0.0 { duration } else { 1.0 };

    let hash = ctx.fx.borrow_mut().hash(&elm);
    let owned = {
        let mut fx = ctx.fx.borrow_mut();
        let owned = fx.get(hash, &prop).is_some_and(|o| Rc::ptr_eq(o, opt));
        if owned {
            fx.remove(hash, &prop);
            fx.prune_transforms(hash);
        }
        owned
    };
    if owned {
        opt.borrow_mut().runtimer = false;
    } else {
        progress = 0.0;
    }
    if progress == 0.0 {
        return;
    }
    elm.set_style(TRANSITION, transition_str(ctx, hash));
    let value = if progress < 1.0 {
        let eased = ctx.ease(easing.as_deref(), progress);
        let unit = get_unit(&from, &to);
        format!("{}{unit}", format_number(start + (end - start) * eased))
    } else {
        to
    };
    set_style_prop(&elm, &prop, &value);
}

/// Jump `opt` to its target value and drop it from the transition.
pub(crate) fn complete(ctx: &Ctx, opt: &OptRef) {
    let (elm, prop, to) = {
        let mut o = opt.borrow_mut();
        o.runtimer = false;
        (o.opts.target.clone(), o.opts.prop.clone(), o.opts.to.clone())
    };
    let hash = {
        let mut fx = ctx.fx.borrow_mut();
        let hash = fx.hash(&elm);
        fx.remove(hash, &prop);
        fx.prune_transforms(hash);
        hash
    };
    elm.set_style(TRANSITION, transition_str(ctx, hash));
    set_style_prop(&elm, &prop, &to);
}

/// Resolve the transform promises among `opts` that no transition in flight will settle:
/// splits whose every function was already at its target.
///
/// Call once all sub-actors of a split were played.
pub(crate) fn settle_transforms(ctx: &Ctx, opts: &[OptRef]) {
    for opt in opts {
        let (elm, prop, promise) = {
            let o = opt.borrow();
            (o.opts.target.clone(), o.opts.prop.clone(), o.promise.clone())
        };
        if !is_transform_prop(&prop) || promise.status() != Status::Pending {
            continue;
        }
        let carried = {
            let mut fx = ctx.fx.borrow_mut();
            let hash = fx.hash(&elm);
            fx.carries(hash, &promise)
        };
        if !carried {
            promise.resolve(done_result(&elm)).disable();
        }
    }
}

/// Settle what a transition end of `property` on `elm` completes.
///
/// A `transform` end finishes every transform function at once and resolves the shared
/// transform promises of the element.
pub(crate) fn transition_end(ctx: &Ctx, elm: &Element, property: &str) {
    let Some(hash) = elm.fx_id() else {
        return;
    };
    if !ctx.fx.borrow().sets.contains_key(&hash) {
        return;
    }
    if property == TRANSFORM {
        let promises = {
            let mut fx = ctx.fx.borrow_mut();
            if let Some(set) = fx.sets.get_mut(&hash) {
                set.retain(|(p, opt)| {
                    let keep = !is_transform_prop(p);
                    if !keep {
                        opt.borrow_mut().runtimer = false;
                    }
                    keep
                });
            }
            fx.transform_promises.remove(&hash).unwrap_or_default()
        };
        elm.set_style(TRANSITION, transition_str(ctx, hash));
        tracing::trace!(element = elm.label(), "transform transition end");
        for promise in promises {
            promise.resolve(done_result(elm)).disable();
        }
        return;
    }
    let removed = ctx.fx.borrow_mut().remove(hash, property);
    if let Some(opt) = removed {
        elm.set_style(TRANSITION, transition_str(ctx, hash));
        let promise = opt.borrow().promise.clone();
        tracing::trace!(element = elm.label(), property, "transition end");
        promise.resolve(done_result(elm)).disable();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/choreo/css.rs"]
mod tests;
