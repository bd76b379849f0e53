//! Integration tests for the spring engine driven through the scheduler
//!
//! These tests verify that:
//! - Animators converge and snap exactly onto their targets
//! - Retargeting redirects motion without discontinuities
//! - Animation blocks report one completion per group
//! - Delayed starts, stops and the frame clock interact correctly
//! - Baked trajectories reproduce live playback

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use sprung_animation::{
    Animatable, AnimationEvent, AnimationParameters, AnimationScheduler, Animator, AnimatorState,
    FrameClock, GroupCompletion, ManualClock, Point, Spring,
};

const DT: f64 = 1.0 / 60.0;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn run_until_idle(scheduler: &AnimationScheduler) -> usize {
    let mut frames = 0;
    while scheduler.has_active_animations() {
        scheduler.tick(DT);
        frames += 1;
        assert!(frames < 10_000, "animations never settled");
    }
    frames
}

fn record_completions<V: Animatable>(
    animator: &Animator<V>,
) -> Rc<RefCell<Vec<AnimationEvent<V>>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let log = events.clone();
    animator.on_completion(move |event| log.borrow_mut().push(event.clone()));
    events
}

/// Repeated scalar steps land within a small epsilon of the target by the settling time
#[test]
fn test_scalar_steps_converge() {
    let springs = [
        Spring::new(0.5, 0.4),
        Spring::interactive(),
        Spring::snappy(),
        Spring::with_mass(0.3, 0.5, 2.0),
    ];

    for spring in springs {
        let steps = (spring.settling_duration() / DT).ceil() as usize;

        let (mut value, mut velocity) = (0.0, 0.0);
        for _ in 0..steps {
            (value, velocity) = spring.step(value, velocity, 100.0, DT);
        }

        assert!(
            (value - 100.0).abs() < 0.05,
            "{spring:?} ended at {value} after {steps} steps"
        );
    }
}

/// A live animator finishes exactly on its target with zero velocity
#[test]
fn test_animator_lands_exactly_on_target() {
    init_tracing();
    let scheduler = AnimationScheduler::new();
    let animator = Animator::new(scheduler.handle(), Spring::animated())
        .with_value(0.0)
        .with_target(100.0);
    let events = record_completions(&animator);

    animator.start();
    let frames = run_until_idle(&scheduler);

    let expected = (Spring::animated().settling_duration() / DT).ceil() as usize;
    assert!(frames.abs_diff(expected) <= 2);
    assert_eq!(animator.value(), Some(100.0));
    assert_eq!(animator.velocity(), 0.0);
    assert_eq!(animator.state(), AnimatorState::Inactive);
    assert_eq!(*events.borrow(), vec![AnimationEvent::Finished { at: 100.0 }]);
}

/// A non-animated spring snaps on the first frame
#[test]
fn test_non_animated_spring_snaps() {
    let scheduler = AnimationScheduler::new();
    let animator = Animator::new(scheduler.handle(), Spring::non_animated()).with_value(Point::ZERO);
    let events = record_completions(&animator);

    scheduler.animate(AnimationParameters::new(Spring::non_animated()), || {
        animator.animate_to(Point::new(30.0, 40.0));
    });

    assert_eq!(animator.value(), Some(Point::new(30.0, 40.0)));
    assert_eq!(
        *events.borrow(),
        vec![AnimationEvent::Finished {
            at: Point::new(30.0, 40.0)
        }]
    );
    assert_eq!(run_until_idle(&scheduler), 1);
}

/// Retargeting keeps value and velocity continuous and reports exactly once
#[test]
fn test_retarget_is_continuous() {
    let scheduler = AnimationScheduler::new();
    let animator = Animator::new(scheduler.handle(), Spring::snappy())
        .with_value(0.0)
        .with_target(100.0);
    let events = record_completions(&animator);

    animator.start();
    for _ in 0..8 {
        scheduler.tick(DT);
    }

    let before = animator.value().unwrap();
    let velocity = animator.velocity();
    assert!(velocity > 0.0);

    animator.set_target(0.0);
    scheduler.tick(DT);

    // The next frame continues from the same value and velocity
    let (expected, _) = Spring::snappy().step(before, velocity, 0.0, DT);
    assert_eq!(animator.value(), Some(expected));

    run_until_idle(&scheduler);
    assert_eq!(animator.value(), Some(0.0));
    assert_eq!(
        *events.borrow(),
        vec![
            AnimationEvent::Retargeted {
                from: 100.0,
                to: 0.0
            },
            AnimationEvent::Finished { at: 0.0 },
        ]
    );
}

/// Once settled, further ticks produce no samples and no second completion
#[test]
fn test_settling_is_idempotent() {
    let scheduler = AnimationScheduler::new();
    let samples = Rc::new(Cell::new(0));
    let animator = Animator::new(scheduler.handle(), Spring::snappy())
        .with_value(0.0)
        .with_target(1.0);
    let events = record_completions(&animator);

    let count = samples.clone();
    animator.on_value_changed(move |_| count.set(count.get() + 1));
    animator.start();
    run_until_idle(&scheduler);

    let settled_samples = samples.get();
    for _ in 0..100 {
        scheduler.tick(DT);
    }

    assert_eq!(samples.get(), settled_samples);
    assert_eq!(events.borrow().len(), 1);
    assert_eq!(animator.value(), Some(1.0));
}

/// A block with several animators completes once, after the slowest settles
#[test]
fn test_group_completion_fires_once() {
    init_tracing();
    let scheduler = AnimationScheduler::new();
    let completions = Rc::new(RefCell::new(Vec::new()));
    let fast = Animator::new(scheduler.handle(), Spring::default()).with_value(0.0);
    let slow = Animator::new(scheduler.handle(), Spring::default()).with_value(Point::ZERO);

    let log = completions.clone();
    scheduler.animate_with_completion(
        AnimationParameters::new(Spring::snappy()),
        || {
            fast.animate_to(1.0);
            slow.animate_to(Point::new(500.0, 500.0));
            slow.set_spring(Spring::animated());
        },
        move |outcome| log.borrow_mut().push(outcome),
    );

    assert!(completions.borrow().is_empty());
    assert_eq!(scheduler.pending_groups(), 1);

    while slow.state() == AnimatorState::Running {
        assert!(completions.borrow().is_empty());
        scheduler.tick(DT);
    }
    assert_eq!(fast.value(), Some(1.0));

    assert_eq!(completions.borrow().len(), 1);
    assert_eq!(
        completions.borrow()[0],
        GroupCompletion {
            finished: true,
            retargeted: false
        }
    );
    assert_eq!(scheduler.pending_groups(), 0);
}

/// Moving an animator into a later block completes the earlier block as retargeted
#[test]
fn test_retargeting_into_new_block() {
    let scheduler = AnimationScheduler::new();
    let first = Rc::new(Cell::new(None));
    let second = Rc::new(Cell::new(None));
    let animator = Animator::new(scheduler.handle(), Spring::default()).with_value(0.0);

    let slot = first.clone();
    scheduler.animate_with_completion(
        AnimationParameters::new(Spring::animated()),
        || animator.animate_to(100.0),
        move |outcome| slot.set(Some(outcome)),
    );
    for _ in 0..10 {
        scheduler.tick(DT);
    }

    let slot = second.clone();
    scheduler.animate_with_completion(
        AnimationParameters::new(Spring::snappy()),
        || animator.animate_to(-50.0),
        move |outcome| slot.set(Some(outcome)),
    );

    assert_eq!(
        first.get(),
        Some(GroupCompletion {
            finished: false,
            retargeted: true
        })
    );
    assert_eq!(second.get(), None);
    assert_eq!(animator.spring(), Spring::snappy());

    run_until_idle(&scheduler);
    assert_eq!(
        second.get(),
        Some(GroupCompletion {
            finished: true,
            retargeted: false
        })
    );
    assert_eq!(animator.value(), Some(-50.0));
}

/// Inner blocks override the outer configuration and keep their own group
#[test]
fn test_nested_blocks() {
    let scheduler = AnimationScheduler::new();
    let outer_done = Rc::new(Cell::new(0));
    let inner_done = Rc::new(Cell::new(0));
    let a = Animator::new(scheduler.handle(), Spring::default()).with_value(0.0);
    let b = Animator::new(scheduler.handle(), Spring::default()).with_value(0.0);
    let handle = scheduler.handle();

    let outer_count = outer_done.clone();
    let inner_count = inner_done.clone();
    scheduler.animate_with_completion(
        AnimationParameters::new(Spring::smooth()),
        || {
            a.animate_to(10.0);
            handle.animate_with_completion(
                AnimationParameters::new(Spring::bouncy()),
                || b.animate_to(20.0),
                move |_| inner_count.set(inner_count.get() + 1),
            );
        },
        move |_| outer_count.set(outer_count.get() + 1),
    );

    assert_eq!(a.spring(), Spring::smooth());
    assert_eq!(b.spring(), Spring::bouncy());
    assert_ne!(a.group(), b.group());
    assert!(scheduler.current_parameters().is_none());

    run_until_idle(&scheduler);
    assert_eq!(outer_done.get(), 1);
    assert_eq!(inner_done.get(), 1);
    assert_eq!(a.value(), Some(10.0));
    assert_eq!(b.value(), Some(20.0));
}

/// Stopping a member immediately counts as finishing it
#[test]
fn test_stop_completes_group() {
    let scheduler = AnimationScheduler::new();
    let outcome = Rc::new(Cell::new(None));
    let animator = Animator::new(scheduler.handle(), Spring::default()).with_value(0.0);

    let slot = outcome.clone();
    scheduler.animate_with_completion(
        AnimationParameters::new(Spring::animated()),
        || animator.animate_to(100.0),
        move |result| slot.set(Some(result)),
    );
    scheduler.tick(DT);
    animator.stop(true);

    assert_eq!(
        outcome.get(),
        Some(GroupCompletion {
            finished: true,
            retargeted: false
        })
    );
    assert!(animator.group().is_none());
}

/// A block delay holds the animator at its start value until the delay elapses
#[test]
fn test_block_delay() {
    let clock = ManualClock::new();
    let scheduler = AnimationScheduler::with_clock(clock.clone());
    let animator = Animator::new(scheduler.handle(), Spring::snappy()).with_value(0.0);

    scheduler.animate(
        AnimationParameters::new(Spring::snappy()).with_delay(0.1),
        || animator.animate_to(1.0),
    );

    assert!(clock.is_running());
    assert_eq!(scheduler.pending_count(), 1);
    for _ in 0..5 {
        scheduler.tick(DT);
        assert_eq!(animator.value(), Some(0.0));
        assert_eq!(animator.state(), AnimatorState::Inactive);
    }

    for _ in 0..3 {
        scheduler.tick(DT);
    }
    assert!(animator.value().unwrap() > 0.0);

    run_until_idle(&scheduler);
    assert_eq!(animator.value(), Some(1.0));
    assert_eq!(clock.start_count(), 1);
    assert_eq!(clock.stop_count(), 1);
}

/// The clock restarts when new work arrives after draining
#[test]
fn test_clock_restarts_for_new_work() {
    let clock = ManualClock::new();
    let scheduler = AnimationScheduler::with_clock(clock.clone());
    let animator = Animator::new(scheduler.handle(), Spring::snappy())
        .with_value(0.0)
        .with_target(1.0);

    animator.start();
    run_until_idle(&scheduler);
    animator.set_target(2.0);
    animator.start();
    run_until_idle(&scheduler);

    assert_eq!(clock.start_count(), 2);
    assert_eq!(clock.stop_count(), 2);
    assert_eq!(animator.value(), Some(2.0));
}

/// Baking reproduces live playback sample for sample
#[test]
fn test_bake_matches_live_playback() {
    let scheduler = AnimationScheduler::new();
    let animator = Animator::new(scheduler.handle(), Spring::bouncy())
        .with_value(Point::new(-20.0, 10.0))
        .with_target(Point::new(200.0, 80.0));
    animator.set_velocity(Point::new(0.0, -300.0));

    let baked = animator.bake(60.0).unwrap();

    let live = Rc::new(RefCell::new(Vec::new()));
    let log = live.clone();
    animator.on_value_changed(move |value| log.borrow_mut().push(*value));
    animator.start();
    run_until_idle(&scheduler);

    // The first emission is the zero-length registration frame
    let live = live.borrow();
    assert_eq!(live[0], Point::new(-20.0, 10.0));
    assert_eq!(&live[1..], baked.samples.as_slice());
    assert_eq!(baked.last(), Some(&Point::new(200.0, 80.0)));
}

/// An injected gesture velocity carries into the animation
#[test]
fn test_injected_velocity() {
    let scheduler = AnimationScheduler::new();
    let flung = Animator::new(scheduler.handle(), Spring::default()).with_value(Point::ZERO);
    let still = Animator::new(scheduler.handle(), Spring::default()).with_value(Point::ZERO);

    scheduler.animate(
        AnimationParameters::new(Spring::interactive()).with_velocity(Point::new(0.0, -2000.0)),
        || flung.animate_to(Point::new(0.0, 10.0)),
    );
    scheduler.animate(AnimationParameters::new(Spring::interactive()), || {
        still.animate_to(Point::new(0.0, 10.0))
    });
    scheduler.tick(DT);

    // Thrown upward against a target below, it overshoots the other way first
    assert!(flung.value().unwrap().y < 0.0);
    assert!(still.value().unwrap().y > 0.0);
}
