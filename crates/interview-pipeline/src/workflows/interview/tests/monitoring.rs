use super::common::*;
use std::collections::BTreeSet;

use crate::workflows::interview::domain::InterviewSettings;
use crate::workflows::interview::monitoring::{
    flags, MonitoringPolicy, SignalCategory, SignalEvaluator, SignalRule, SignalScope,
    TelemetrySnapshot,
};

fn evaluator() -> SignalEvaluator {
    SignalEvaluator::standard(&MonitoringPolicy::default())
}

fn flag_set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

type Mutation = Box<dyn Fn(&mut TelemetrySnapshot)>;

fn case(
    flag: &'static str,
    mutate: impl Fn(&mut TelemetrySnapshot) + 'static,
) -> (&'static str, Mutation) {
    (flag, Box::new(mutate))
}

#[test]
fn clean_snapshot_raises_nothing() {
    assert!(evaluator().evaluate(&clean_telemetry()).is_empty());
    assert_eq!(evaluator().len(), 11);
}

#[test]
fn each_standard_rule_fires_on_its_own_condition() {
    let cases = vec![
        case(flags::EXCESSIVE_TAB_SWITCHING, |snapshot| snapshot.screen.tab_changes = 3),
        case(flags::SWITCHED_APPLICATION, |snapshot| {
            snapshot.screen.active_window = "Slack".to_string()
        }),
        case(flags::FACE_NOT_VISIBLE, |snapshot| snapshot.webcam.face_visible = false),
        case(flags::MULTIPLE_FACES, |snapshot| snapshot.webcam.multiple_faces = true),
        case(flags::LOOKING_AWAY, |snapshot| snapshot.webcam.looking_away = true),
        case(flags::HIGH_BACKGROUND_NOISE, |snapshot| {
            snapshot.audio.background_noise = 0.71
        }),
        case(flags::MULTIPLE_SPEAKERS, |snapshot| snapshot.audio.multiple_speakers = true),
        case(flags::SUDDEN_AUDIO_CHANGE, |snapshot| snapshot.audio.sudden_changes = true),
        case(flags::CLIPBOARD_ACCESS, |snapshot| snapshot.system.clipboard_access = true),
        case(flags::SUSPICIOUS_SHORTCUT, |snapshot| {
            snapshot.system.keyboard_shortcuts = vec!["Ctrl+V".to_string()]
        }),
        case(flags::SUSPICIOUS_BROWSER_ACTION, |snapshot| {
            snapshot.system.browser_actions = vec!["NEW_TAB".to_string()]
        }),
    ];

    let evaluator = evaluator();
    for (flag, mutate) in cases {
        let mut snapshot = clean_telemetry();
        mutate(&mut snapshot);
        assert_eq!(evaluator.evaluate(&snapshot), flag_set(&[flag]), "rule {flag}");
    }
}

#[test]
fn thresholds_are_exclusive() {
    let mut snapshot = clean_telemetry();
    snapshot.screen.tab_changes = 2;
    snapshot.audio.background_noise = 0.7;
    snapshot.system.keyboard_shortcuts = vec!["ctrl+z".to_string()];
    assert!(evaluator().evaluate(&snapshot).is_empty());
}

#[test]
fn flags_are_the_union_of_independent_rules() {
    let mut snapshot = clean_telemetry();
    snapshot.screen.active_window = "Google Search".to_string();
    snapshot.screen.tab_changes = 5;
    snapshot.webcam.multiple_faces = true;
    snapshot.system.clipboard_access = true;

    let evaluator = evaluator();
    let first = evaluator.evaluate(&snapshot);
    let second = evaluator.evaluate(&snapshot);

    assert_eq!(first, second);
    assert_eq!(
        first,
        flag_set(&[
            flags::CLIPBOARD_ACCESS,
            flags::EXCESSIVE_TAB_SWITCHING,
            flags::MULTIPLE_FACES,
            flags::SWITCHED_APPLICATION,
        ])
    );
}

#[test]
fn scope_follows_interview_settings() {
    let mut snapshot = clean_telemetry();
    snapshot.screen.tab_changes = 9;
    snapshot.webcam.face_visible = false;
    snapshot.audio.multiple_speakers = true;
    snapshot.system.clipboard_access = true;

    let settings = InterviewSettings {
        require_camera_on: false,
        monitor_screen_share: false,
        prevent_copy_paste: false,
        ..InterviewSettings::default()
    };
    let scope = SignalScope::from_settings(&settings);

    assert!(scope.includes(SignalCategory::Audio));
    assert!(!scope.includes(SignalCategory::Screen));
    assert_eq!(
        evaluator().evaluate_scoped(&snapshot, &scope),
        flag_set(&[flags::MULTIPLE_SPEAKERS])
    );
    assert_eq!(
        evaluator().evaluate_scoped(&snapshot, &SignalScope::all()),
        evaluator().evaluate(&snapshot)
    );
}

#[test]
fn custom_rules_register_without_touching_the_standard_set() {
    let evaluator = evaluator().with_rule(SignalRule::new(
        SignalCategory::Webcam,
        "silent while recording",
        |snapshot: &TelemetrySnapshot| !snapshot.webcam.speaking,
    ));
    assert_eq!(evaluator.len(), 12);

    let mut snapshot = clean_telemetry();
    snapshot.webcam.speaking = false;
    assert_eq!(
        evaluator.evaluate(&snapshot),
        flag_set(&["silent while recording"])
    );
}

#[test]
fn empty_registry_grows_through_register() {
    let mut evaluator = SignalEvaluator::new();
    assert!(evaluator.is_empty());
    assert!(evaluator.evaluate(&clean_telemetry()).is_empty());

    evaluator
        .register(SignalRule::new(
            SignalCategory::Screen,
            "any tab change",
            |snapshot: &TelemetrySnapshot| snapshot.screen.tab_changes > 0,
        ))
        .register(SignalRule::new(
            SignalCategory::Audio,
            "any background noise",
            |snapshot: &TelemetrySnapshot| snapshot.audio.background_noise > 0.0,
        ));
    assert_eq!(evaluator.len(), 2);

    let mut snapshot = clean_telemetry();
    snapshot.screen.tab_changes = 1;
    assert_eq!(
        evaluator.evaluate(&snapshot),
        flag_set(&["any background noise", "any tab change"])
    );
}

#[test]
fn policy_thresholds_are_configurable() {
    let policy = MonitoringPolicy {
        max_tab_changes: 10,
        interview_window_marker: "assessment".to_string(),
        ..MonitoringPolicy::default()
    };
    let mut snapshot = clean_telemetry();
    snapshot.screen.tab_changes = 5;
    snapshot.screen.active_window = "Skills Assessment".to_string();

    assert!(SignalEvaluator::standard(&policy)
        .evaluate(&snapshot)
        .is_empty());
}
