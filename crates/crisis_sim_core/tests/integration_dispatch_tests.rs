mod support;

use crisis_sim_core::events::{EventType, SimEvent};
use crisis_sim_core::test_helpers::{disaster_at, Recorder};
use support::playback::{millis, scripted_service, secs, service_with_bounds};

#[test]
fn dispatch_order_is_monotonic_regardless_of_load_order() {
    let service = service_with_bounds(0, 10_000, 1.0);
    service.load_events(vec![
        disaster_at(4_000),
        disaster_at(1_000),
        disaster_at(3_000),
        disaster_at(1_000),
        disaster_at(2_000),
    ]);
    let (recorder, _subscription) = Recorder::attach(service.bus());

    service.start();
    for _ in 0..10 {
        service.tick(millis(700));
    }

    let fired = recorder.scripted_timestamps();
    assert_eq!(fired, vec![1_000, 1_000, 2_000, 3_000, 4_000]);
    assert!(fired.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn scripted_events_precede_their_time_advanced() {
    let service = scripted_service(&[1_500, 2_500]);
    let (recorder, _subscription) = Recorder::attach(service.bus());
    service.start();
    service.tick(secs(2));
    service.tick(secs(1));

    let mut last_time = i64::MIN;
    let mut pending_scripted = Vec::new();
    for event in recorder.events() {
        match event {
            SimEvent::Scripted(scripted) => pending_scripted.push(scripted.timestamp),
            SimEvent::TimeAdvanced(state) => {
                assert!(state.current_time >= last_time);
                assert!(pending_scripted.iter().all(|&ts| ts <= state.current_time));
                pending_scripted.clear();
                last_time = state.current_time;
            }
            _ => {}
        }
    }
    assert!(pending_scripted.is_empty());
}

#[test]
fn event_fires_exactly_once_across_close_ticks() {
    let service = scripted_service(&[1_000]);
    let (recorder, _subscription) = Recorder::attach(service.bus());
    service.start();

    // t0, t0 + 1ms, t0 + 2s
    assert_eq!(service.tick(secs(1)).dispatched, 1);
    assert_eq!(service.tick(millis(1)).dispatched, 0);
    assert_eq!(service.tick(secs(2)).dispatched, 0);

    assert_eq!(recorder.count(EventType::DisasterEvent), 1);
    assert_eq!(service.current_time(), 3_001);
}

#[test]
fn zero_length_ticks_dispatch_nothing_new() {
    let service = scripted_service(&[0, 5_000]);
    let (recorder, _subscription) = Recorder::attach(service.bus());
    service.start();
    for _ in 0..3 {
        service.tick(millis(0));
    }
    assert_eq!(recorder.scripted_timestamps(), vec![0]);
    assert_eq!(recorder.count(EventType::TimeAdvanced), 3);
}

#[test]
fn playback_result_is_speed_invariant() {
    let timestamps = [500, 2_500, 4_000, 7_250, 9_999];

    let slow = scripted_service(&timestamps);
    let (slow_recorder, _slow_subscription) = Recorder::attach(slow.bus());
    slow.start();
    for _ in 0..10 {
        slow.tick(secs(1));
    }

    let fast = scripted_service(&timestamps);
    fast.set_speed(2.0).expect("valid speed");
    let (fast_recorder, _fast_subscription) = Recorder::attach(fast.bus());
    fast.start();
    for _ in 0..5 {
        fast.tick(secs(1));
    }

    assert_eq!(slow.current_time(), fast.current_time());
    assert_eq!(slow_recorder.scripted_timestamps(), fast_recorder.scripted_timestamps());
    assert_eq!(slow_recorder.scripted_timestamps(), timestamps.to_vec());
}

#[test]
fn speed_change_mid_run_scales_following_ticks() {
    let service = service_with_bounds(0, 100_000, 1.0);
    service.start();
    service.tick(secs(2));
    service.set_speed(10.0).expect("valid speed");
    service.tick(secs(2));
    assert_eq!(service.current_time(), 22_000);
    assert!(service.set_speed(f64::NAN).is_err());
    assert_eq!(service.state().speed, 10.0);
}

#[test]
fn progress_is_clamped_to_percent_range() {
    let service = service_with_bounds(1_000, 3_000, 1.0);
    assert_eq!(service.time_progress(), 0.0);
    service.set_time(2_000);
    assert_eq!(service.time_progress(), 50.0);
    service.set_time(-50_000);
    assert_eq!(service.current_time(), 1_000);
    assert_eq!(service.time_progress(), 0.0);
    service.set_time(i64::MAX);
    assert_eq!(service.current_time(), 3_000);
    assert_eq!(service.time_progress(), 100.0);

    let empty = service_with_bounds(5_000, 5_000, 1.0);
    assert_eq!(empty.time_progress(), 0.0);
}

#[test]
fn unsubscribed_listener_stops_receiving() {
    let service = scripted_service(&[1_000, 2_000]);
    let (recorder, subscription) = Recorder::attach(service.bus());
    service.start();
    service.tick(secs(1));
    subscription.unsubscribe();
    service.tick(secs(1));
    assert_eq!(recorder.scripted_timestamps(), vec![1_000]);
}

#[test]
fn typed_subscription_only_sees_its_type() {
    let service = scripted_service(&[1_000]);
    let (recorder, _all) = Recorder::attach(service.bus());
    let hits = std::rc::Rc::new(std::cell::Cell::new(0));
    let counter = std::rc::Rc::clone(&hits);
    let _typed = service.on(EventType::SimulationStarted, move |event| {
        assert_eq!(event.event_type(), EventType::SimulationStarted);
        counter.set(counter.get() + 1);
    });
    service.start();
    service.tick(secs(2));
    assert_eq!(hits.get(), 1);
    assert_eq!(
        recorder.types(),
        vec![
            EventType::SimulationStarted,
            EventType::DisasterEvent,
            EventType::TimeAdvanced
        ]
    );
}
