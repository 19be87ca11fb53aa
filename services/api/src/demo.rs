use crate::infra::{build_service, sample_interview, PipelineService, SAMPLE_INTERVIEW_ID};
use clap::Args;
use interview_pipeline::config::PipelineConfig;
use interview_pipeline::error::AppError;
use interview_pipeline::workflows::interview::{
    AnswerSubmission, InterviewId, MediaKind, TelemetrySnapshot,
};
use serde_json::json;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Number of candidates to run through the sample interview.
    #[arg(long, default_value_t = 3)]
    pub(crate) candidates: usize,
    /// Recording to submit for every answer. Defaults to generated bytes.
    #[arg(long)]
    pub(crate) recording: Option<PathBuf>,
    /// Attach telemetry that trips the anti-cheating rules to the last candidate's answers.
    #[arg(long)]
    pub(crate) suspicious: bool,
}

struct Recording {
    bytes: Option<Vec<u8>>,
    content_type: String,
}

impl Recording {
    fn load(path: Option<PathBuf>) -> Result<Self, AppError> {
        match path {
            Some(path) => {
                let content_type = mime_guess::from_path(&path)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string();
                Ok(Self {
                    bytes: Some(std::fs::read(&path)?),
                    content_type,
                })
            }
            None => Ok(Self {
                bytes: None,
                content_type: MediaKind::Webm.content_type().to_string(),
            }),
        }
    }

    fn bytes_for(&self, candidate: usize, question: usize) -> Vec<u8> {
        match &self.bytes {
            Some(bytes) => bytes.clone(),
            None => {
                let seed = (candidate * 7 + question * 3 + 1) as u8;
                (0..8192u32)
                    .map(|index| (index as u8).wrapping_mul(seed).wrapping_add(seed))
                    .collect()
            }
        }
    }
}

fn telemetry(suspicious: bool) -> Result<TelemetrySnapshot, AppError> {
    let snapshot = json!({
        "screen": {
            "active_window": if suspicious { "Search - Browser" } else { "Interview" },
            "tab_changes": if suspicious { 4 } else { 0 }
        },
        "webcam": {
            "face_visible": true,
            "multiple_faces": suspicious,
            "looking_away": false,
            "speaking": true
        },
        "audio": {
            "background_noise": if suspicious { 0.8 } else { 0.1 },
            "multiple_speakers": suspicious,
            "sudden_changes": false
        },
        "system": {
            "clipboard_access": suspicious,
            "keyboard_shortcuts": if suspicious { vec!["ctrl+v"] } else { Vec::new() }
        }
    });
    Ok(serde_json::from_value(snapshot)?)
}

fn candidate_email(index: usize) -> String {
    format!("candidate{:02}@example.com", index + 1)
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        candidates,
        recording,
        suspicious,
    } = args;

    let emails: Vec<String> = (0..candidates).map(candidate_email).collect();
    let interview = sample_interview(&emails);
    let question_count = interview.questions.len();
    let service = build_service(vec![interview], &PipelineConfig::default());
    let recording = Recording::load(recording)?;
    let interview_id = InterviewId(SAMPLE_INTERVIEW_ID.to_string());

    println!("Interview Pipeline Demo");
    println!("=======================");
    println!(
        "Interview {interview_id}: {question_count} questions, {candidates} candidates"
    );
    println!();

    for (index, email) in emails.iter().enumerate() {
        let flagged = suspicious && index + 1 == candidates;
        run_candidate(&service, &interview_id, email, index, question_count, &recording, flagged)
            .await?;
    }

    println!();
    render_results(&service, &interview_id)
}

async fn run_candidate(
    service: &PipelineService,
    interview_id: &InterviewId,
    email: &str,
    index: usize,
    question_count: usize,
    recording: &Recording,
    flagged: bool,
) -> Result<(), AppError> {
    let start = service.start_session(interview_id, email, None)?;

    for question_index in 0..question_count {
        let media_ref = service.upload_media(
            recording.bytes_for(index, question_index),
            &recording.content_type,
        )?;
        service
            .submit_answer(
                &start.session_id,
                AnswerSubmission {
                    question_index,
                    media_ref,
                    duration_seconds: 90,
                    telemetry: Some(telemetry(flagged)?),
                },
            )
            .await?;
    }

    let receipt = service.complete_session(&start.session_id).await?;
    println!(
        "- {email} completed {} with {:.1}%",
        receipt.session_id, receipt.overall_score_pct
    );
    Ok(())
}

fn render_results(service: &PipelineService, interview_id: &InterviewId) -> Result<(), AppError> {
    let results = service.results(interview_id)?;

    println!("Ranking for {}", results.title);
    for entry in &results.ranking {
        println!(
            "{:>3}. {} ({:.3})",
            entry.rank, entry.candidate_email, entry.overall_score
        );
    }

    let flagged: Vec<_> = results
        .sessions
        .iter()
        .filter(|view| !view.behavior.suspicious_activities.is_empty())
        .collect();
    if !flagged.is_empty() {
        println!();
        println!("Flagged behavior:");
        for view in flagged {
            let activities: Vec<&str> = view
                .behavior
                .suspicious_activities
                .iter()
                .map(String::as_str)
                .collect();
            println!(
                "- {}: {} ({} answers)",
                view.candidate_email,
                activities.join(", "),
                view.behavior.flagged_answers
            );
        }
    }
    Ok(())
}
