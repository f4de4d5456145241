use super::*;
use crate::choreo::actor::{ActorOpts, OptState};

fn opt(elm: &Element, prop: &str, duration: f64, start: Option<f64>) -> OptRef {
    let opt = OptState::new_ref(
        ActorOpts::new(elm, prop, "1").duration(duration),
        ActorPromise::new(),
    );
    opt.borrow_mut().start_time = start;
    opt
}

#[test]
fn hash_is_stamped_once_per_element() {
    let mut fx = FxTable::default();
    let a = Element::new("a");
    let b = Element::new("b");
    let ha = fx.hash(&a);
    assert_eq!(fx.hash(&a), ha);
    assert_ne!(fx.hash(&b), ha);
    assert_eq!(a.fx_id(), Some(ha));
    assert!(fx.is_empty());
}

#[test]
fn insert_replaces_in_place_and_remove_returns_the_opt() {
    let mut fx = FxTable::default();
    let elm = Element::new("a");
    let h = fx.hash(&elm);
    let first = opt(&elm, "left", 100.0, Some(0.0));
    let second = opt(&elm, "left", 200.0, Some(0.0));
    fx.insert(h, "left", Rc::clone(&first));
    fx.insert(h, "top", opt(&elm, "top", 100.0, Some(0.0)));
    fx.insert(h, "left", Rc::clone(&second));
    assert!(fx.get(h, "left").is_some_and(|o| Rc::ptr_eq(o, &second)));
    assert_eq!(fx.sets[&h][0].0, "left");
    assert!(fx.remove(h, "left").is_some_and(|o| Rc::ptr_eq(&o, &second)));
    assert!(fx.remove(h, "left").is_none());
    assert!(!fx.is_empty());
}

#[test]
fn due_waits_for_the_written_target_and_the_duration() {
    let mut fx = FxTable::default();
    let elm = Element::new("a");
    let h = fx.hash(&elm);
    let left = opt(&elm, "left", 100.0, Some(50.0));
    fx.insert(h, "left", Rc::clone(&left));
    left.borrow_mut().runtimer = true;
    assert!(fx.due(1000.0).is_empty());

    left.borrow_mut().runtimer = false;
    assert!(fx.due(149.0).is_empty());
    assert_eq!(fx.due(150.0), vec![(elm.clone(), "left".to_string())]);
}

#[test]
fn transform_functions_end_together() {
    let mut fx = FxTable::default();
    let elm = Element::new("a");
    let h = fx.hash(&elm);
    fx.insert(h, "translateX", opt(&elm, "translateX", 100.0, Some(0.0)));
    fx.insert(h, "scale", opt(&elm, "scale", 300.0, Some(0.0)));
    assert!(fx.has_transform(h));
    assert!(fx.due(200.0).is_empty());
    assert_eq!(fx.due(300.0), vec![(elm.clone(), TRANSFORM.to_string())]);
}

#[test]
fn transform_promises_are_kept_only_while_a_function_is_in_flight() {
    let mut fx = FxTable::default();
    let elm = Element::new("a");
    let h = fx.hash(&elm);
    let shared = ActorPromise::new();
    fx.register_transform(h, &shared);
    fx.register_transform(h, &shared);
    assert_eq!(fx.transform_promises[&h].len(), 1);

    let sub = OptState::new_ref(ActorOpts::new(&elm, "scaleX", "2"), shared.clone());
    fx.insert(h, "scaleX", sub);
    assert!(fx.carries(h, &shared));
    assert!(!fx.carries(h, &ActorPromise::new()));
    fx.prune_transforms(h);
    assert!(fx.transform_promises.contains_key(&h));

    fx.remove(h, "scaleX");
    assert!(!fx.carries(h, &shared));
    fx.prune_transforms(h);
    assert!(!fx.transform_promises.contains_key(&h));
}
