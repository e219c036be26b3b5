//! Control facade and channel lifecycle integration tests
//!
//! Runs against a recording engine; no audio hardware required

use std::sync::{Arc, Barrier};

use guideline_audio::config::Config;
use guideline_audio::sound::{AlertKind, ChannelRole, ChannelState, SessionState, StereoVolume};
use guideline_audio::GuidanceControl;

mod common;

use common::{Call, RecordingEngine, control, control_with, sounds};

const LOOP_PATHS: [&str; 3] = ["steering.wav", "warning.wav", "turn.wav"];

fn permutations() -> Vec<[usize; 3]> {
    vec![
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ]
}

#[test]
fn test_loops_start_muted_once_loaded() {
    let engine = RecordingEngine::immediate();
    let (control, _sink) = control(&engine);

    assert!(control.channels().is_started());
    let started = engine.play_loops();
    assert_eq!(started.len(), 3);
    assert!(started.iter().all(|(_, volume, _)| volume.is_silent()));

    let steering = engine.handle_for("steering.wav");
    let warning = engine.handle_for("warning.wav");
    let turning = engine.handle_for("turn.wav");
    assert!(started.contains(&(steering, StereoVolume::SILENT, 2.0)));
    assert!(started.contains(&(warning, StereoVolume::SILENT, 2.0)));
    assert!(started.contains(&(turning, StereoVolume::SILENT, 1.0)));

    for role in ChannelRole::ALL {
        assert_eq!(control.channels().channel_state(role), ChannelState::Silenced);
    }
    assert_eq!(control.channels().session(), SessionState::Paused);
}

#[test]
fn test_loops_wait_for_last_completion() {
    for order in permutations() {
        let engine = RecordingEngine::manual();
        let (mut control, _sink) = control(&engine);

        assert!(engine.complete(LOOP_PATHS[order[0]]));
        assert!(engine.complete(LOOP_PATHS[order[1]]));
        assert!(!control.channels().is_started());
        assert!(engine.play_loops().is_empty());

        let before = engine.call_count();
        control.set_position(0.5);
        assert_eq!(engine.call_count(), before, "position applied before start");
        assert_eq!(control.channels().session(), SessionState::Paused);

        assert!(engine.complete(LOOP_PATHS[order[2]]));
        assert!(control.channels().is_started());
        assert_eq!(engine.play_loops().len(), 3, "order {order:?}");
    }
}

#[test]
fn test_concurrent_completions_start_exactly_once() {
    for order in permutations() {
        for _ in 0..20 {
            let engine = RecordingEngine::manual();
            let (control, _sink) = control(&engine);
            let barrier = Arc::new(Barrier::new(3));

            std::thread::scope(|scope| {
                for index in order {
                    let engine = Arc::clone(&engine);
                    let barrier = Arc::clone(&barrier);
                    scope.spawn(move || {
                        barrier.wait();
                        assert!(engine.complete(LOOP_PATHS[index]));
                    });
                }
            });

            assert!(control.channels().is_started());
            assert_eq!(engine.play_loops().len(), 3);
        }
    }
}

#[test]
fn test_failed_loop_does_not_block_others() {
    let engine = RecordingEngine::manual();
    engine.fail("warning.wav");
    let (mut control, _sink) = control(&engine);

    for path in LOOP_PATHS {
        assert!(engine.complete(path));
    }

    assert!(control.channels().is_started());
    assert_eq!(control.channels().channel_state(ChannelRole::Warning), ChannelState::Failed);
    assert_eq!(engine.play_loops().len(), 2);

    control.set_position(0.8);
    let warning = engine.handle_for("warning.wav");
    assert!(!engine.calls().iter().any(|call| matches!(
        call,
        Call::SetVolume(h, _) | Call::SetRate(h, _) if *h == warning
    )));
    assert_eq!(control.channels().channel_state(ChannelRole::Steering), ChannelState::Playing);
}

#[test]
fn test_every_loop_failing_still_completes() {
    let engine = RecordingEngine::manual();
    for path in LOOP_PATHS {
        engine.fail(path);
    }
    let (mut control, _sink) = control(&engine);
    for path in LOOP_PATHS {
        engine.complete(path);
    }

    assert!(control.channels().is_started());
    assert!(engine.play_loops().is_empty());

    let before = engine.call_count();
    control.set_position(0.5);
    control.set_no_line_found();
    assert_eq!(engine.call_count(), before);
}

#[test]
fn test_position_pans_steering() {
    let engine = RecordingEngine::immediate();
    let (mut control, _sink) = control(&engine);
    let steering = engine.handle_for("steering.wav");

    control.set_position(0.5);
    assert_eq!(control.channels().session(), SessionState::Active);
    let volume = engine.last_volume(steering).unwrap();
    assert_eq!(volume, StereoVolume::new(0.0, 1.0));
    assert!(engine.last_rate(steering).unwrap() > 1.0);

    control.set_position(-0.5);
    assert_eq!(engine.last_volume(steering).unwrap(), StereoVolume::new(1.0, 0.0));

    control.set_position(0.0);
    assert_eq!(engine.last_volume(steering).unwrap(), StereoVolume::FULL);
    assert_eq!(engine.last_rate(steering).unwrap(), 1.0);

    let diagnostics = control.channels().last_steering().unwrap();
    assert_eq!(diagnostics.volume, StereoVolume::FULL);
}

#[test]
fn test_warning_louder_near_edge() {
    let engine = RecordingEngine::immediate();
    let (mut control, _sink) = control(&engine);
    let warning = engine.handle_for("warning.wav");

    control.set_position(0.0);
    let centered = engine.last_volume(warning).unwrap();
    assert!((centered.left - centered.right).abs() < f32::EPSILON);

    control.set_position(0.95);
    let edge = engine.last_volume(warning).unwrap();
    assert!(edge.left < edge.right);
    assert!(engine.last_rate(warning).unwrap() > 1.0);
    assert_eq!(control.channels().last_warning().unwrap().volume, edge);
}

#[test]
fn test_position_clamped_and_non_finite_ignored() {
    let engine = RecordingEngine::immediate();
    let (mut control, _sink) = control(&engine);
    let steering = engine.handle_for("steering.wav");

    control.set_position(1.0);
    let at_edge = (engine.last_volume(steering), engine.last_rate(steering));
    control.set_position(0.0);
    control.set_position(7.0);
    assert_eq!((engine.last_volume(steering), engine.last_rate(steering)), at_edge);

    let before = engine.call_count();
    control.set_position(f32::NAN);
    control.set_position(f32::INFINITY);
    assert_eq!(engine.call_count(), before);
}

#[test]
fn test_no_line_then_position_recovers() {
    let engine = RecordingEngine::immediate();
    let (mut control, _sink) = control(&engine);
    let stop = engine.handle_for("stop.wav");
    let steering = engine.handle_for("steering.wav");

    control.set_position(0.3);
    control.set_no_line_found();
    assert_eq!(engine.play_onces(), vec![(stop, StereoVolume::FULL, 1)]);
    assert_eq!(control.channels().session(), SessionState::Paused);
    for role in ChannelRole::ALL {
        assert_eq!(control.channels().channel_state(role), ChannelState::Silenced);
    }

    control.set_position(0.5);
    assert_eq!(control.channels().session(), SessionState::Active);
    assert_eq!(control.channels().channel_state(ChannelRole::Steering), ChannelState::Playing);
    assert_eq!(engine.last_volume(steering).unwrap(), StereoVolume::new(0.0, 1.0));
}

#[test]
fn test_no_line_alerts_once_per_loss() {
    let engine = RecordingEngine::immediate();
    let (mut control, _sink) = control(&engine);

    control.set_no_line_found();
    assert!(engine.play_onces().is_empty(), "no alert before steering began");

    control.set_position(0.2);
    control.set_no_line_found();
    control.set_no_line_found();
    control.set_no_line_found();
    assert_eq!(engine.play_onces().len(), 1);
}

#[test]
fn test_pause_resume_stays_silent() {
    let engine = RecordingEngine::immediate();
    let (mut control, _sink) = control(&engine);
    control.set_position(0.6);

    control.pause();
    for path in LOOP_PATHS {
        let handle = engine.handle_for(path);
        assert!(engine.last_volume(handle).unwrap().is_silent(), "{path} still audible");
    }

    let before = engine.call_count();
    control.resume();
    assert_eq!(engine.call_count(), before);
    for role in ChannelRole::ALL {
        assert_eq!(control.channels().channel_state(role), ChannelState::Silenced);
    }

    control.set_position(0.6);
    assert_eq!(control.channels().channel_state(ChannelRole::Steering), ChannelState::Playing);
}

#[test]
fn test_alerts_use_priorities() {
    let engine = RecordingEngine::immediate();
    let (control, _sink) = control(&engine);

    control.warn_low_battery();
    control.alert_notification();

    let low_battery = engine.handle_for("low_battery.wav");
    let notification = engine.handle_for("alert_notification.wav");
    assert_eq!(
        engine.play_onces(),
        vec![
            (low_battery, StereoVolume::FULL, 0),
            (notification, StereoVolume::FULL, 0),
        ]
    );
    assert!(AlertKind::Stop.priority() > AlertKind::LowBattery.priority());
}

#[test]
fn test_alert_skipped_until_loaded() {
    let engine = RecordingEngine::manual();
    let (control, _sink) = control(&engine);

    control.warn_low_battery();
    assert!(engine.play_onces().is_empty());
    assert_eq!(control.channels().alert_state(AlertKind::LowBattery), ChannelState::Loading);

    engine.complete("low_battery.wav");
    control.warn_low_battery();
    assert_eq!(engine.play_onces().len(), 1);

    engine.fail("alert_notification.wav");
    engine.complete("alert_notification.wav");
    control.alert_notification();
    assert_eq!(engine.play_onces().len(), 1);
    assert_eq!(control.channels().alert_state(AlertKind::Notification), ChannelState::Failed);
}

#[test]
fn test_stop_releases_everything() {
    let engine = RecordingEngine::immediate();
    let (mut control, sink) = control(&engine);
    control.set_position(0.4);
    control.stop();

    let calls = engine.calls();
    for path in LOOP_PATHS {
        let handle = engine.handle_for(path);
        assert!(calls.contains(&Call::Stop(handle)));
        assert!(calls.contains(&Call::Release(handle)));
    }
    for path in ["stop.wav", "low_battery.wav", "alert_notification.wav"] {
        assert!(calls.contains(&Call::Release(engine.handle_for(path))));
    }
    for role in ChannelRole::ALL {
        assert_eq!(control.channels().channel_state(role), ChannelState::Stopped);
    }
    assert!(control.is_stopped());
    assert!(sink.is_shut_down());
}

#[test]
fn test_calls_after_stop_are_no_ops() {
    let engine = RecordingEngine::immediate();
    let (mut control, sink) = control(&engine);
    control.set_position(0.4);
    control.stop();
    let before = engine.call_count();

    control.set_position(0.9);
    control.set_turning(30.0);
    control.check_straight_path(0.0, 500.0);
    control.set_no_line_found();
    control.warn_low_battery();
    control.alert_notification();
    control.pause();
    control.resume();
    control.stop();

    assert_eq!(engine.call_count(), before);
    assert!(sink.texts().is_empty());
}

#[test]
fn test_load_completing_after_stop_is_released() {
    let engine = RecordingEngine::manual();
    let (mut control, _sink) = control(&engine);
    control.stop();

    for path in engine.pending() {
        engine.complete(path);
    }

    assert!(engine.play_loops().is_empty());
    for path in LOOP_PATHS {
        let handle = engine.handle_for(path);
        assert!(engine.calls().contains(&Call::Release(handle)));
    }
}

#[test]
fn test_turning_loop_silent_by_default() {
    let engine = RecordingEngine::immediate();
    let (mut control, _sink) = control(&engine);
    let turning = engine.handle_for("turn.wav");

    control.set_position(0.1);
    control.set_turning(25.0);
    assert!(engine.last_volume(turning).unwrap().is_silent());
    assert_eq!(control.channels().channel_state(ChannelRole::Turning), ChannelState::Silenced);
}

#[test]
fn test_turn_tone_in_opposite_ear() {
    let engine = RecordingEngine::immediate();
    let config = Config {
        turn_tone: true,
        ..Config::default()
    };
    let (mut control, _sink) = control_with(&engine, config);
    let turning = engine.handle_for("turn.wav");

    control.set_turning(-30.0);
    assert!(
        engine.last_volume(turning).unwrap().is_silent(),
        "turn tone before steering began"
    );

    control.set_position(0.1);
    control.set_turning(-30.0);
    let volume = engine.last_volume(turning).unwrap();
    assert_eq!(volume.left, 0.0);
    assert!((volume.right - 0.1875).abs() < 1e-6);
    assert_eq!(control.channels().channel_state(ChannelRole::Turning), ChannelState::Playing);

    control.set_turning(2.0);
    assert!(engine.last_volume(turning).unwrap().is_silent());
}

#[test]
fn test_invalid_config_rejected() {
    let engine = RecordingEngine::immediate();
    let config = Config {
        sensitivity: 1.5,
        ..Config::default()
    };
    let result = GuidanceControl::new(
        config,
        engine.clone(),
        guideline_audio::speech::Speech::disabled(),
    );
    assert!(result.is_err());
    assert_eq!(engine.call_count(), 0, "nothing loaded for a rejected config");
}

#[test]
fn test_custom_sound_paths_loaded() {
    let engine = RecordingEngine::immediate();
    let config = Config {
        sounds: sounds().in_dir(std::path::Path::new("/srv/guideline")),
        ..Config::default()
    };
    let (control, _sink) = control_with(&engine, config);

    assert!(control.channels().is_started());
    engine.handle_for("/srv/guideline/steering.wav");
    engine.handle_for("/srv/guideline/alert_notification.wav");
}
