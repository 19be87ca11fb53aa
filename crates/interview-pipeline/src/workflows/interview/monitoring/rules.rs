use super::policy::MonitoringPolicy;
use super::{SignalCategory, SignalRule, TelemetrySnapshot};

/// Flag labels raised by the standard rule set.
pub mod flags {
    pub const EXCESSIVE_TAB_SWITCHING: &str = "excessive tab switching";
    pub const SWITCHED_APPLICATION: &str = "switched application";
    pub const FACE_NOT_VISIBLE: &str = "face not visible";
    pub const MULTIPLE_FACES: &str = "multiple faces detected";
    pub const LOOKING_AWAY: &str = "looking away";
    pub const HIGH_BACKGROUND_NOISE: &str = "high background noise";
    pub const MULTIPLE_SPEAKERS: &str = "multiple speakers";
    pub const SUDDEN_AUDIO_CHANGE: &str = "sudden audio change";
    pub const CLIPBOARD_ACCESS: &str = "clipboard access";
    pub const SUSPICIOUS_SHORTCUT: &str = "suspicious shortcut";
    pub const SUSPICIOUS_BROWSER_ACTION: &str = "suspicious browser action";
}

pub(crate) fn standard_rules(policy: &MonitoringPolicy) -> Vec<SignalRule> {
    let max_tab_changes = policy.max_tab_changes;
    let marker = policy.interview_window_marker.to_ascii_lowercase();
    let noise_threshold = policy.background_noise_threshold;
    let shortcuts = lowercase_all(&policy.disallowed_shortcuts);
    let browser_actions = lowercase_all(&policy.disallowed_browser_actions);

    vec![
        SignalRule::new(
            SignalCategory::Screen,
            flags::EXCESSIVE_TAB_SWITCHING,
            move |snapshot: &TelemetrySnapshot| snapshot.screen.tab_changes > max_tab_changes,
        ),
        SignalRule::new(
            SignalCategory::Screen,
            flags::SWITCHED_APPLICATION,
            move |snapshot: &TelemetrySnapshot| {
                !snapshot
                    .screen
                    .active_window
                    .to_ascii_lowercase()
                    .contains(&marker)
            },
        ),
        SignalRule::new(
            SignalCategory::Webcam,
            flags::FACE_NOT_VISIBLE,
            |snapshot: &TelemetrySnapshot| !snapshot.webcam.face_visible,
        ),
        SignalRule::new(
            SignalCategory::Webcam,
            flags::MULTIPLE_FACES,
            |snapshot: &TelemetrySnapshot| snapshot.webcam.multiple_faces,
        ),
        SignalRule::new(
            SignalCategory::Webcam,
            flags::LOOKING_AWAY,
            |snapshot: &TelemetrySnapshot| snapshot.webcam.looking_away,
        ),
        SignalRule::new(
            SignalCategory::Audio,
            flags::HIGH_BACKGROUND_NOISE,
            move |snapshot: &TelemetrySnapshot| snapshot.audio.background_noise > noise_threshold,
        ),
        SignalRule::new(
            SignalCategory::Audio,
            flags::MULTIPLE_SPEAKERS,
            |snapshot: &TelemetrySnapshot| snapshot.audio.multiple_speakers,
        ),
        SignalRule::new(
            SignalCategory::Audio,
            flags::SUDDEN_AUDIO_CHANGE,
            |snapshot: &TelemetrySnapshot| snapshot.audio.sudden_changes,
        ),
        SignalRule::new(
            SignalCategory::System,
            flags::CLIPBOARD_ACCESS,
            |snapshot: &TelemetrySnapshot| snapshot.system.clipboard_access,
        ),
        SignalRule::new(
            SignalCategory::System,
            flags::SUSPICIOUS_SHORTCUT,
            move |snapshot: &TelemetrySnapshot| {
                any_listed(&snapshot.system.keyboard_shortcuts, &shortcuts)
            },
        ),
        SignalRule::new(
            SignalCategory::System,
            flags::SUSPICIOUS_BROWSER_ACTION,
            move |snapshot: &TelemetrySnapshot| {
                any_listed(&snapshot.system.browser_actions, &browser_actions)
            },
        ),
    ]
}

fn lowercase_all(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim().to_ascii_lowercase())
        .collect()
}

fn any_listed(observed: &[String], deny_list: &[String]) -> bool {
    observed.iter().any(|value| {
        let value = value.trim().to_ascii_lowercase();
        deny_list.iter().any(|denied| *denied == value)
    })
}
