use super::*;
use crate::foundation::clock::ManualClock;
use std::cell::RefCell;

type Log = Rc<RefCell<Vec<(f64, f64)>>>;

fn setup() -> (ManualClock, Mainloop) {
    let clock = ManualClock::new(0.0);
    let ml = Mainloop::new(Rc::new(clock.clone()));
    (clock, ml)
}

fn recorder() -> (Log, impl FnMut(f64, f64) + 'static) {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    (log, move |v, t| sink.borrow_mut().push((v, t)))
}

fn counter() -> (Rc<RefCell<u32>>, impl FnOnce() + 'static) {
    let hits = Rc::new(RefCell::new(0));
    let h = Rc::clone(&hits);
    (hits, move || *h.borrow_mut() += 1)
}

#[test]
fn tween_steps_from_start_to_end_then_leaves_stage() {
    let (clock, mut ml) = setup();
    let (log, step) = recorder();
    let (done, callback) = counter();
    ml.add_tween("s", 0.0, 100.0, 1000.0, TweenOpts::new(step).easing("linear").callback(callback));
    ml.run("s");
    assert_eq!(log.borrow()[0], (0.0, 0.0));

    clock.set(250.0);
    ml.tick();
    clock.set(1000.0);
    ml.tick();
    clock.set(1200.0);
    ml.tick();

    assert_eq!(*log.borrow(), vec![(0.0, 0.0), (25.0, 250.0), (100.0, 1000.0)]);
    assert_eq!(*done.borrow(), 1);
    assert_eq!(ml.info("s").unwrap().renders, 0);
    assert!(ml.is_idle());
}

#[test]
fn reverse_tween_interpolates_downwards() {
    let (clock, mut ml) = setup();
    let (log, step) = recorder();
    ml.add_tween("s", 100.0, 0.0, 100.0, TweenOpts::new(step));
    ml.run("s");
    clock.set(40.0);
    ml.tick();
    assert_eq!(log.borrow()[1], (60.0, 40.0));
}

#[test]
fn pause_excludes_paused_time() {
    let (clock, mut ml) = setup();
    let (log, step) = recorder();
    ml.add_tween("s", 0.0, 100.0, 1000.0, TweenOpts::new(step));
    ml.run("s");
    clock.set(500.0);
    ml.tick();
    ml.pause("s");
    assert!(!ml.is_running("s"));

    clock.set(1500.0);
    ml.tick();
    assert_eq!(log.borrow().len(), 2);

    ml.run("s");
    ml.tick();
    assert_eq!(*log.borrow().last().unwrap(), (50.0, 500.0));
    clock.set(2000.0);
    ml.tick();
    assert_eq!(*log.borrow().last().unwrap(), (100.0, 1000.0));
}

#[test]
fn zero_duration_steps_to_end_and_defers_callback() {
    let (_clock, mut ml) = setup();
    let (log, step) = recorder();
    let (done, callback) = counter();
    ml.add_tween("s", 0.0, 10.0, 0.0, TweenOpts::new(step).callback(callback));
    assert_eq!(*log.borrow(), vec![(10.0, 0.0)]);
    assert_eq!(*done.borrow(), 0);
    assert!(!ml.is_idle());
    ml.tick();
    assert_eq!(*done.borrow(), 1);
    assert!(ml.is_idle());
}

#[test]
fn delayed_tween_waits_and_pause_freezes_the_delay() {
    let (clock, mut ml) = setup();
    let (log, step) = recorder();
    ml.add_tween("s", 0.0, 100.0, 100.0, TweenOpts::new(step).delay(300.0));
    ml.run("s");
    assert!(log.borrow().is_empty());
    assert_eq!(ml.info("s").unwrap().delayed, 1);

    clock.set(200.0);
    ml.tick();
    ml.pause("s");
    clock.set(5000.0);
    ml.tick();
    assert!(log.borrow().is_empty());

    ml.run("s");
    clock.set(5050.0);
    ml.tick();
    assert!(log.borrow().is_empty());
    clock.set(5100.0);
    ml.tick();
    assert_eq!(*log.borrow(), vec![(0.0, 0.0)]);
    clock.set(5200.0);
    ml.tick();
    assert_eq!(*log.borrow().last().unwrap(), (100.0, 100.0));
}

#[test]
fn complete_snaps_everything_including_delayed_tweens() {
    let (clock, mut ml) = setup();
    let (log_a, step_a) = recorder();
    let (log_b, step_b) = recorder();
    let (done, callback) = counter();
    ml.add_tween("s", 0.0, 1.0, 1000.0, TweenOpts::new(step_a).callback(callback));
    ml.add_tween("s", 5.0, 6.0, 1000.0, TweenOpts::new(step_b).delay(500.0));
    ml.run("s");
    clock.set(100.0);
    ml.tick();
    ml.complete("s");

    assert_eq!(*log_a.borrow().last().unwrap(), (1.0, 1000.0));
    assert_eq!(*log_b.borrow(), vec![(5.0, 0.0), (6.0, 1000.0)]);
    assert_eq!(*done.borrow(), 1);
    assert!(ml.info("s").is_none());
    assert!(!ml.is_running("s"));
}

#[test]
fn remove_render_and_remove_stage_stop_callbacks() {
    let (clock, mut ml) = setup();
    let (log, step) = recorder();
    let id = ml.add_tween("s", 0.0, 1.0, 100.0, TweenOpts::new(step));
    ml.run("s");
    ml.remove_render("s", id);
    clock.set(200.0);
    ml.tick();
    assert_eq!(log.borrow().len(), 1);

    let (log, step) = recorder();
    ml.add_tween("t", 0.0, 1.0, 100.0, TweenOpts::new(step).delay(50.0));
    ml.run("t");
    ml.remove("t");
    clock.set(1000.0);
    ml.tick();
    assert!(log.borrow().is_empty());
}

#[test]
fn fps_cap_skips_frames_inside_the_interval() {
    let (clock, mut ml) = setup();
    ml.config(SchedulerConfig { fps: 10 });
    let frames = Rc::new(RefCell::new(Vec::new()));
    let f = Rc::clone(&frames);
    ml.add_render("s", move |frame: &FrameCtx| {
        f.borrow_mut().push(frame.timestamp);
        Flow::Continue
    });
    ml.run("s");
    for t in [100.0, 150.0, 200.0, 260.0, 299.0] {
        clock.set(t);
        ml.tick();
    }
    assert_eq!(*frames.borrow(), vec![100.0, 200.0]);
}

#[test]
fn stop_halts_frames_and_start_resumes() {
    let (clock, mut ml) = setup();
    let frames = Rc::new(RefCell::new(0));
    let f = Rc::clone(&frames);
    ml.add_render("s", move |_: &FrameCtx| {
        *f.borrow_mut() += 1;
        Flow::Continue
    });
    ml.run("s");
    ml.tick();
    ml.stop();
    clock.advance(16.0);
    ml.tick();
    assert_eq!(*frames.borrow(), 1);
    assert!(ml.is_idle());
    ml.start();
    ml.tick();
    assert_eq!(*frames.borrow(), 2);
}

#[test]
fn custom_easing_is_used_by_name() {
    let (clock, mut ml) = setup();
    ml.add_easing("half", |_| 0.5);
    let (log, step) = recorder();
    ml.add_tween("s", 0.0, 10.0, 100.0, TweenOpts::new(step).easing("half"));
    ml.run("s");
    clock.set(10.0);
    ml.tick();
    assert_eq!(log.borrow()[1], (5.0, 10.0));
}
