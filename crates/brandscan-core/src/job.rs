//! Analysis job lifecycle.
//!
//! A job moves `processing -> analyzing -> {completed | failed}`, or straight
//! from `processing` to a terminal state on a cache hit or submission error.
//! [`JobState::apply`] is the only place transitions are decided; callers
//! persist the returned state with a conditional update so a terminal row is
//! never overwritten.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Analyzing,
    Completed,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Analyzing => "analyzing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "processing" => Some(JobStatus::Processing),
            "analyzing" => Some(JobStatus::Analyzing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers of the remote analysis run, persisted so polling can resume
/// after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub thread_id: String,
    pub run_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PillarScores {
    pub search_visibility: u8,
    pub digital_authority: u8,
    pub social_presence: u8,
    pub brand_mentions: u8,
    pub sentiment: u8,
    pub content_footprint: u8,
    pub brand_consistency: u8,
    pub competitive_landscape: u8,
}

impl PillarScores {
    /// Score used for a pillar the analysis output did not score.
    pub const DEFAULT_SCORE: u8 = 50;

    /// Read the eight `<pillar>_score` fields from analysis output.
    ///
    /// Missing or non-numeric scores fall back to [`Self::DEFAULT_SCORE`];
    /// numeric scores are rounded and clamped to 0..=100.
    #[must_use]
    pub fn from_output(output: &serde_json::Value) -> Self {
        let score = |key: &str| -> u8 {
            let value = output.get(key);
            let number = value.and_then(serde_json::Value::as_f64).or_else(|| {
                value
                    .and_then(serde_json::Value::as_str)
                    .and_then(|s| s.trim().parse::<f64>().ok())
            });
            match number {
                Some(n) if n.is_finite() => {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let clamped = n.round().clamp(0.0, 100.0) as u8;
                    clamped
                }
                _ => Self::DEFAULT_SCORE,
            }
        };

        Self {
            search_visibility: score("search_visibility_score"),
            digital_authority: score("digital_authority_score"),
            social_presence: score("social_presence_score"),
            brand_mentions: score("brand_mentions_score"),
            sentiment: score("sentiment_analysis_score"),
            content_footprint: score("content_footprint_score"),
            brand_consistency: score("brand_consistency_score"),
            competitive_landscape: score("competitive_landscape_score"),
        }
    }

    #[must_use]
    pub fn values(&self) -> [u8; 8] {
        [
            self.search_visibility,
            self.digital_authority,
            self.social_presence,
            self.brand_mentions,
            self.sentiment,
            self.content_footprint,
            self.brand_consistency,
            self.competitive_landscape,
        ]
    }

    /// Rounded mean of the eight pillar scores.
    #[must_use]
    pub fn overall(&self) -> u8 {
        let sum: u32 = self.values().iter().map(|v| u32::from(*v)).sum();
        // Round half up on the integer mean of eight values.
        let rounded = (sum * 2 + 8) / 16;
        u8::try_from(rounded).unwrap_or(100)
    }
}

/// The final report for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub overall_score: u8,
    pub pillar_scores: PillarScores,
    pub recommendations: BTreeMap<String, String>,
    pub summary: Option<String>,
    /// The analysis output as returned.
    pub raw: serde_json::Value,
}

impl ScanResult {
    #[must_use]
    pub fn from_output(output: serde_json::Value) -> Self {
        let pillar_scores = PillarScores::from_output(&output);
        let recommendations = output
            .get("recommendations")
            .and_then(serde_json::Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        let summary = output
            .get("summary")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);

        Self {
            overall_score: pillar_scores.overall(),
            pillar_scores,
            recommendations,
            summary,
            raw: output,
        }
    }
}

/// Persisted view of one analysis job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub status: JobStatus,
    pub handle: Option<JobHandle>,
    pub result: Option<ScanResult>,
    pub error: Option<String>,
}

impl Default for JobState {
    fn default() -> Self {
        Self::processing()
    }
}

/// Signals that can move a job forward.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// A fresh cached report exists for the request's fingerprint.
    CacheHit(ScanResult),
    /// The bundle was accepted by the analysis service.
    Submitted(JobHandle),
    SubmissionFailed(String),
    RemoteRunning,
    /// Checking the remote run failed transiently.
    PollError(String),
    RemoteFailed(String),
    RemoteCompleted(ScanResult),
    /// The job was given up on locally (stale sweep or persistence failure).
    Abandoned(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Nothing to persist.
    Stay,
    Advance(JobState),
}

impl JobState {
    #[must_use]
    pub fn processing() -> Self {
        Self {
            status: JobStatus::Processing,
            handle: None,
            result: None,
            error: None,
        }
    }

    #[must_use]
    pub fn apply(&self, event: JobEvent) -> Transition {
        use JobEvent as E;
        use JobStatus as S;

        if self.status.is_terminal() {
            return Transition::Stay;
        }

        let next = match (self.status, event) {
            (S::Processing, E::CacheHit(result)) => self.completed(result),
            (S::Processing, E::Submitted(handle)) => JobState {
                status: S::Analyzing,
                handle: Some(handle),
                result: None,
                error: None,
            },
            (S::Processing, E::SubmissionFailed(message)) => self.failed(message),
            (S::Analyzing, E::RemoteFailed(message)) => self.failed(message),
            (S::Analyzing, E::RemoteCompleted(result)) => self.completed(result),
            (_, E::Abandoned(message)) => self.failed(message),
            _ => return Transition::Stay,
        };
        Transition::Advance(next)
    }

    fn completed(&self, result: ScanResult) -> JobState {
        JobState {
            status: JobStatus::Completed,
            handle: self.handle.clone(),
            result: Some(result),
            error: None,
        }
    }

    fn failed(&self, message: String) -> JobState {
        JobState {
            status: JobStatus::Failed,
            handle: self.handle.clone(),
            result: None,
            error: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn handle() -> JobHandle {
        JobHandle {
            thread_id: "thread_1".to_string(),
            run_id: "run_1".to_string(),
        }
    }

    fn analyzing() -> JobState {
        match JobState::processing().apply(JobEvent::Submitted(handle())) {
            Transition::Advance(state) => state,
            Transition::Stay => panic!("submission should advance"),
        }
    }

    fn result() -> ScanResult {
        ScanResult::from_output(json!({ "search_visibility_score": 70 }))
    }

    #[test]
    fn submission_moves_processing_to_analyzing_with_handle() {
        let state = analyzing();
        assert_eq!(state.status, JobStatus::Analyzing);
        assert_eq!(state.handle, Some(handle()));
    }

    #[test]
    fn cache_hit_completes_directly() {
        let Transition::Advance(state) = JobState::processing().apply(JobEvent::CacheHit(result()))
        else {
            panic!("cache hit should advance");
        };
        assert_eq!(state.status, JobStatus::Completed);
        assert!(state.result.is_some());
    }

    #[test]
    fn running_and_poll_errors_are_no_ops() {
        let state = analyzing();
        assert_eq!(state.apply(JobEvent::RemoteRunning), Transition::Stay);
        assert_eq!(
            state.apply(JobEvent::PollError("connection reset".to_string())),
            Transition::Stay
        );
    }

    #[test]
    fn remote_failure_keeps_handle_and_message() {
        let Transition::Advance(state) =
            analyzing().apply(JobEvent::RemoteFailed("run expired".to_string()))
        else {
            panic!("remote failure should advance");
        };
        assert_eq!(state.status, JobStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("run expired"));
        assert_eq!(state.handle, Some(handle()));
    }

    #[test]
    fn terminal_states_ignore_every_event() {
        let Transition::Advance(done) = analyzing().apply(JobEvent::RemoteCompleted(result()))
        else {
            panic!("completion should advance");
        };
        assert_eq!(done.apply(JobEvent::RemoteCompleted(result())), Transition::Stay);
        assert_eq!(
            done.apply(JobEvent::RemoteFailed("late".to_string())),
            Transition::Stay
        );
        assert_eq!(
            done.apply(JobEvent::Abandoned("stale".to_string())),
            Transition::Stay
        );
    }

    #[test]
    fn remote_events_do_not_apply_before_submission() {
        let state = JobState::processing();
        assert_eq!(state.apply(JobEvent::RemoteCompleted(result())), Transition::Stay);
        assert_eq!(state.apply(JobEvent::RemoteRunning), Transition::Stay);
    }

    #[test]
    fn abandoned_fails_processing_jobs() {
        let Transition::Advance(state) =
            JobState::processing().apply(JobEvent::Abandoned("stuck".to_string()))
        else {
            panic!("abandon should advance");
        };
        assert_eq!(state.status, JobStatus::Failed);
    }

    #[test]
    fn missing_scores_default_to_fifty() {
        let scores = PillarScores::from_output(&json!({
            "search_visibility_score": 90,
            "digital_authority_score": "70",
            "social_presence_score": 140,
            "brand_mentions_score": -3,
            "sentiment_analysis_score": null
        }));
        assert_eq!(scores.search_visibility, 90);
        assert_eq!(scores.digital_authority, 70);
        assert_eq!(scores.social_presence, 100);
        assert_eq!(scores.brand_mentions, 0);
        assert_eq!(scores.sentiment, 50);
        assert_eq!(scores.competitive_landscape, 50);
    }

    #[test]
    fn overall_is_rounded_mean() {
        let scores = PillarScores {
            search_visibility: 80,
            digital_authority: 61,
            social_presence: 50,
            brand_mentions: 50,
            sentiment: 50,
            content_footprint: 50,
            brand_consistency: 50,
            competitive_landscape: 50,
        };
        // 441 / 8 = 55.125
        assert_eq!(scores.overall(), 55);

        let halves = PillarScores {
            search_visibility: 54,
            ..scores
        };
        // 415 / 8 = 51.875
        assert_eq!(halves.overall(), 52);
    }

    #[test]
    fn scan_result_reads_recommendations_and_summary() {
        let result = ScanResult::from_output(json!({
            "recommendations": { "search_visibility": "Publish more", "bogus": 3 },
            "summary": "Healthy brand."
        }));
        assert_eq!(result.overall_score, 50);
        assert_eq!(
            result.recommendations.get("search_visibility").map(String::as_str),
            Some("Publish more")
        );
        assert!(!result.recommendations.contains_key("bogus"));
        assert_eq!(result.summary.as_deref(), Some("Healthy brand."));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            JobStatus::Processing,
            JobStatus::Analyzing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("queued"), None);
    }
}
