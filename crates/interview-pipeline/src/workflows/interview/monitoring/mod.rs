//! Anti-cheating signal evaluation over candidate monitoring telemetry.
//!
//! The evaluator is a registry of independent `(category, flag, predicate)` rules. Every rule
//! sees the same snapshot and the result is the union of the flags that fired, so rules can be
//! added or removed without touching the others or the call sites.

mod policy;
mod rules;

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::InterviewSettings;

pub use policy::MonitoringPolicy;
pub use rules::flags;

/// Point-in-time monitoring data captured alongside one answer submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub screen: ScreenObservation,
    pub webcam: WebcamObservation,
    pub audio: AudioObservation,
    pub system: SystemEvents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
    pub active_window: String,
    pub tab_changes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebcamObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
    pub face_visible: bool,
    pub multiple_faces: bool,
    pub looking_away: bool,
    #[serde(default)]
    pub speaking: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
    /// Normalized to [0, 1].
    pub background_noise: f64,
    pub multiple_speakers: bool,
    pub sudden_changes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemEvents {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
    pub clipboard_access: bool,
    #[serde(default)]
    pub keyboard_shortcuts: Vec<String>,
    #[serde(default)]
    pub browser_actions: Vec<String>,
}

/// Telemetry source a rule inspects; interviews can switch whole categories off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Screen,
    Webcam,
    Audio,
    System,
}

/// Set of categories that apply to one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalScope {
    categories: BTreeSet<SignalCategory>,
}

impl SignalScope {
    pub fn all() -> Self {
        Self {
            categories: [
                SignalCategory::Screen,
                SignalCategory::Webcam,
                SignalCategory::Audio,
                SignalCategory::System,
            ]
            .into_iter()
            .collect(),
        }
    }

    /// Screen rules follow `monitor_screen_share`, webcam rules `require_camera_on`, and system
    /// rules `prevent_copy_paste`. Audio rules always apply.
    pub fn from_settings(settings: &InterviewSettings) -> Self {
        let mut categories = BTreeSet::from([SignalCategory::Audio]);
        if settings.monitor_screen_share {
            categories.insert(SignalCategory::Screen);
        }
        if settings.require_camera_on {
            categories.insert(SignalCategory::Webcam);
        }
        if settings.prevent_copy_paste {
            categories.insert(SignalCategory::System);
        }
        Self { categories }
    }

    pub fn includes(&self, category: SignalCategory) -> bool {
        self.categories.contains(&category)
    }
}

type Predicate = Box<dyn Fn(&TelemetrySnapshot) -> bool + Send + Sync>;

/// A single independent predicate → flag entry.
pub struct SignalRule {
    category: SignalCategory,
    flag: String,
    predicate: Predicate,
}

impl SignalRule {
    pub fn new<F>(category: SignalCategory, flag: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&TelemetrySnapshot) -> bool + Send + Sync + 'static,
    {
        Self {
            category,
            flag: flag.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn category(&self) -> SignalCategory {
        self.category
    }

    pub fn flag(&self) -> &str {
        &self.flag
    }

    pub fn fires(&self, snapshot: &TelemetrySnapshot) -> bool {
        (self.predicate)(snapshot)
    }
}

impl fmt::Debug for SignalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalRule")
            .field("category", &self.category)
            .field("flag", &self.flag)
            .finish_non_exhaustive()
    }
}

/// Stateless evaluator holding the rule registry.
#[derive(Debug, Default)]
pub struct SignalEvaluator {
    rules: Vec<SignalRule>,
}

impl SignalEvaluator {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the standard anti-cheating rules.
    pub fn standard(policy: &MonitoringPolicy) -> Self {
        Self {
            rules: rules::standard_rules(policy),
        }
    }

    pub fn register(&mut self, rule: SignalRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn with_rule(mut self, rule: SignalRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn evaluate(&self, snapshot: &TelemetrySnapshot) -> BTreeSet<String> {
        self.collect(snapshot, |_| true)
    }

    pub fn evaluate_scoped(
        &self,
        snapshot: &TelemetrySnapshot,
        scope: &SignalScope,
    ) -> BTreeSet<String> {
        self.collect(snapshot, |rule| scope.includes(rule.category))
    }

    fn collect(
        &self,
        snapshot: &TelemetrySnapshot,
        applies: impl Fn(&SignalRule) -> bool,
    ) -> BTreeSet<String> {
        self.rules
            .iter()
            .filter(|rule| applies(rule) && rule.fires(snapshot))
            .map(|rule| rule.flag.clone())
            .collect()
    }
}
