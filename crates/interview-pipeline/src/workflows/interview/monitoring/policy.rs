use serde::{Deserialize, Serialize};

/// Thresholds and deny-lists consumed by the standard monitoring rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringPolicy {
    pub max_tab_changes: u32,
    pub background_noise_threshold: f64,
    pub interview_window_marker: String,
    pub disallowed_shortcuts: Vec<String>,
    pub disallowed_browser_actions: Vec<String>,
}

impl Default for MonitoringPolicy {
    fn default() -> Self {
        Self {
            max_tab_changes: 2,
            background_noise_threshold: 0.7,
            interview_window_marker: "interview".to_string(),
            disallowed_shortcuts: vec![
                "ctrl+c".to_string(),
                "ctrl+v".to_string(),
                "alt+tab".to_string(),
            ],
            disallowed_browser_actions: vec![
                "new_tab".to_string(),
                "new_window".to_string(),
                "download".to_string(),
            ],
        }
    }
}
