use chrono::Utc;
use interview_pipeline::config::PipelineConfig;
use interview_pipeline::error::AppError;
use interview_pipeline::workflows::interview::{
    InMemoryInterviewRepository, InMemoryMediaStore, InterviewDefinition, InterviewId,
    InterviewPipelineService, InterviewSettings, Question,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type PipelineService =
    InterviewPipelineService<InMemoryInterviewRepository, InMemoryMediaStore>;

pub(crate) const SAMPLE_INTERVIEW_ID: &str = "int-demo";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Interview used when no seed file is given.
pub(crate) fn sample_interview(invitees: &[String]) -> InterviewDefinition {
    let prompts = [
        ("Tell us about a project you are proud of.", 120),
        ("Describe how you would design a scalable API.", 180),
        ("How do you test and debug a production issue?", 180),
    ];
    let questions = prompts
        .iter()
        .enumerate()
        .map(|(index, (text, max_duration_seconds))| Question {
            text: text.to_string(),
            media_ref: None,
            max_duration_seconds: *max_duration_seconds,
            order: index as u32 + 1,
        })
        .collect();

    let mut interview = InterviewDefinition::new(
        InterviewId(SAMPLE_INTERVIEW_ID.to_string()),
        "Software Engineer",
        questions,
        InterviewSettings::default(),
    );
    let now = Utc::now();
    for invitee in invitees {
        interview.invite(invitee, now);
    }
    interview
}

pub(crate) fn parse_interviews(raw: &str) -> Result<Vec<InterviewDefinition>, AppError> {
    Ok(serde_json::from_str(raw)?)
}

/// Interview definitions from a JSON seed file, or the sample interview.
pub(crate) fn load_interviews(path: Option<&Path>) -> Result<Vec<InterviewDefinition>, AppError> {
    match path {
        Some(path) => parse_interviews(&std::fs::read_to_string(path)?),
        None => Ok(vec![sample_interview(&[
            "ada@example.com".to_string(),
            "grace@example.com".to_string(),
        ])]),
    }
}

pub(crate) fn build_service(
    interviews: Vec<InterviewDefinition>,
    config: &PipelineConfig,
) -> Arc<PipelineService> {
    let repository = Arc::new(InMemoryInterviewRepository::with_interviews(interviews));
    let media = Arc::new(InMemoryMediaStore::default());
    Arc::new(InterviewPipelineService::new(repository, media, config))
}
