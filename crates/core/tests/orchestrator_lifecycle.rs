//! Orchestrator lifecycle integration tests.
//!
//! These tests drive podcast jobs through the orchestrator against mock
//! factories: queued -> processing -> completed | failed

use std::sync::Arc;
use std::time::Duration;

use podcaster_core::{
    remote::{RemoteArtifact, RemoteJobResult},
    testing::{fixtures, MockRemoteApi, ScriptStep},
    AdmissionPolicy, Job, JobStatus, PodcastOrchestrator, SubmitError,
};

const AUDIO_BASE: &str = "https://audio.test/v1/jobs";
const IMAGE_BASE: &str = "https://images.test/v1/jobs";

/// Test helper holding the orchestrator and its mock factories.
struct TestHarness {
    audio: Arc<MockRemoteApi>,
    thumbnail: Arc<MockRemoteApi>,
    orchestrator: PodcastOrchestrator,
}

impl TestHarness {
    fn new(capacity: usize) -> Self {
        Self::with_config(capacity, fixtures::fast_generation_config(20))
    }

    fn with_config(capacity: usize, config: podcaster_core::GenerationConfig) -> Self {
        let audio = Arc::new(MockRemoteApi::new(AUDIO_BASE));
        let thumbnail = Arc::new(MockRemoteApi::new(IMAGE_BASE));
        let orchestrator = fixtures::orchestrator_with_config(
            config,
            capacity,
            audio.clone(),
            Some(thumbnail.clone()),
        );
        Self {
            audio,
            thumbnail,
            orchestrator,
        }
    }

    fn audio_succeeds(&self) {
        self.audio.set_default_script(vec![
            ScriptStep::Pending,
            ScriptStep::complete_with("audio", "/files/podcast.wav"),
        ]);
    }

    fn thumbnail_succeeds(&self) {
        self.thumbnail.set_default_script(vec![ScriptStep::complete_with(
            "image",
            "https://cdn.images.test/thumb.png",
        )]);
    }

    /// Wait until the job reaches a terminal status and return it.
    async fn wait_for_terminal(&self, job_id: &str) -> Job {
        self.wait_for(job_id, |job| job.status.is_terminal()).await
    }

    async fn wait_for(&self, job_id: &str, condition: impl Fn(&Job) -> bool) -> Job {
        let start = std::time::Instant::now();
        while start.elapsed() < Duration::from_secs(5) {
            let job = self.orchestrator.job(job_id).expect("job should exist");
            if condition(&job) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "job {} never reached the expected state: {:?}",
            job_id,
            self.orchestrator.job(job_id)
        );
    }
}

// =============================================================================
// Successful generations
// =============================================================================

#[tokio::test]
async fn test_job_completes_with_both_artifacts() {
    let harness = TestHarness::new(2);
    harness.audio_succeeds();
    harness.thumbnail_succeeds();

    let receipt = harness.orchestrator.submit("  Black holes  ").unwrap();
    assert_eq!(receipt.status, JobStatus::Processing);
    assert_eq!(receipt.topic, "Black holes");

    let job = harness.wait_for_terminal(&receipt.id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        job.audio_artifact_location.as_deref(),
        Some("https://audio.test/files/podcast.wav")
    );
    assert_eq!(
        job.thumbnail_artifact_location.as_deref(),
        Some("https://cdn.images.test/thumb.png")
    );
    assert_eq!(job.remote_audio_job_id.as_deref(), Some("remote-1"));
    assert_eq!(job.remote_thumbnail_job_id.as_deref(), Some("remote-1"));
    assert_eq!(job.title.as_deref(), Some("60 seconds on: Black holes"));
    assert_eq!(
        job.summary.as_deref(),
        Some("An AI-generated podcast on \"Black holes\".")
    );
    assert!(job.completed_at.is_some());
    assert!(job.error_detail.is_none());

    let audio_request = &harness.audio.requests()[0];
    assert!(audio_request.content.contains("60-second audio podcast: Black holes"));
    let thumbnail_request = &harness.thumbnail.requests()[0];
    assert_eq!(thumbnail_request.language.as_deref(), Some("en"));

    assert_eq!(harness.orchestrator.limiter_stats().active_count, 0);
}

#[tokio::test]
async fn test_completion_waits_for_slower_thumbnail() {
    let harness = TestHarness::new(1);
    harness
        .audio
        .set_default_script(vec![ScriptStep::complete_with("audio", "/a.wav")]);
    harness.thumbnail.set_default_script(vec![
        ScriptStep::Pending,
        ScriptStep::Pending,
        ScriptStep::Pending,
        ScriptStep::complete_with("image", "/files/thumb.png"),
    ]);

    let receipt = harness.orchestrator.submit("Tides").unwrap();
    let job = harness.wait_for_terminal(&receipt.id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        job.thumbnail_artifact_location.as_deref(),
        Some("https://images.test/files/thumb.png")
    );
    assert_eq!(harness.thumbnail.status_calls("remote-1"), 4);
}

#[tokio::test]
async fn test_audio_artifact_falls_back_to_output() {
    let harness = TestHarness::new(1);
    harness.audio.set_default_script(vec![ScriptStep::Complete(
        RemoteJobResult::completed(
            vec![RemoteArtifact::typed("transcript", "/files/t.txt")],
            vec![RemoteArtifact::typed("file", "https://cdn.audio.test/out.wav?sig=1")],
        ),
    )]);
    harness.thumbnail_succeeds();

    let receipt = harness.orchestrator.submit("Tides").unwrap();
    let job = harness.wait_for_terminal(&receipt.id).await;

    assert_eq!(
        job.audio_artifact_location.as_deref(),
        Some("https://cdn.audio.test/out.wav?sig=1")
    );
}

// =============================================================================
// Thumbnail degradation
// =============================================================================

#[tokio::test]
async fn test_thumbnail_create_failure_uses_placeholder() {
    let harness = TestHarness::new(1);
    harness.audio_succeeds();
    harness.thumbnail.fail_creates("image quota exceeded");

    let receipt = harness.orchestrator.submit("Volcanoes").unwrap();
    let job = harness.wait_for_terminal(&receipt.id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        job.thumbnail_artifact_location.as_deref(),
        Some("/thumbnails/default.svg")
    );
    assert!(job.remote_thumbnail_job_id.is_none());
    assert!(job.audio_artifact_location.is_some());
}

#[tokio::test]
async fn test_thumbnail_remote_failure_uses_placeholder() {
    let harness = TestHarness::new(1);
    harness.audio_succeeds();
    harness
        .thumbnail
        .set_default_script(vec![ScriptStep::Fail("NSFW filter".to_string())]);

    let receipt = harness.orchestrator.submit("Volcanoes").unwrap();
    let job = harness.wait_for_terminal(&receipt.id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        job.thumbnail_artifact_location.as_deref(),
        Some("/thumbnails/default.svg")
    );
    assert!(job.error_detail.is_none());
}

#[tokio::test]
async fn test_missing_thumbnail_factory_uses_placeholder() {
    let audio = Arc::new(MockRemoteApi::new(AUDIO_BASE));
    audio.set_default_script(vec![ScriptStep::complete_with("audio", "/a.wav")]);
    let orchestrator = fixtures::orchestrator(1, audio.clone(), None);

    let receipt = orchestrator.submit("Volcanoes").unwrap();
    let start = std::time::Instant::now();
    let job = loop {
        let job = orchestrator.job(&receipt.id).unwrap();
        if job.status.is_terminal() || start.elapsed() > Duration::from_secs(5) {
            break job;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        job.thumbnail_artifact_location.as_deref(),
        Some("/thumbnails/default.svg")
    );
}

// =============================================================================
// Audio failures
// =============================================================================

#[tokio::test]
async fn test_remote_audio_failure_on_third_check() {
    let harness = TestHarness::new(1);
    harness.audio.set_default_script(vec![
        ScriptStep::Pending,
        ScriptStep::Pending,
        ScriptStep::Fail("Speech synthesis backend unavailable".to_string()),
        ScriptStep::complete_with("audio", "/never.wav"),
    ]);
    harness.thumbnail_succeeds();

    let receipt = harness.orchestrator.submit("Quantum computing").unwrap();
    let job = harness.wait_for_terminal(&receipt.id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error_detail.as_deref(),
        Some("Speech synthesis backend unavailable")
    );
    assert!(job.audio_artifact_location.is_none());
    assert!(job.completed_at.is_some());

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(harness.audio.status_calls("remote-1"), 3);
}

#[tokio::test]
async fn test_audio_timeout_after_exact_attempts() {
    let harness = TestHarness::with_config(1, fixtures::fast_generation_config(6));
    harness.thumbnail_succeeds();

    let receipt = harness.orchestrator.submit("Slow topic").unwrap();
    let job = harness.wait_for_terminal(&receipt.id).await;

    assert_eq!(job.status, JobStatus::Failed);
    let detail = job.error_detail.unwrap();
    assert!(detail.contains("timed out after 6 status checks"), "{}", detail);

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(harness.audio.status_calls("remote-1"), 6);
}

#[tokio::test]
async fn test_transient_status_errors_are_retried() {
    let harness = TestHarness::new(1);
    harness.audio.set_default_script(vec![
        ScriptStep::HttpError(503),
        ScriptStep::HttpError(502),
        ScriptStep::complete_with("audio", "/files/a.wav"),
    ]);
    harness.thumbnail_succeeds();

    let receipt = harness.orchestrator.submit("Tides").unwrap();
    let job = harness.wait_for_terminal(&receipt.id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(harness.audio.status_calls("remote-1"), 3);
}

#[tokio::test]
async fn test_audio_create_failure_fails_job() {
    let harness = TestHarness::new(1);
    harness.audio.fail_creates("quota exceeded");
    harness.thumbnail_succeeds();

    let receipt = harness.orchestrator.submit("Tides").unwrap();
    let job = harness.wait_for_terminal(&receipt.id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_detail.unwrap().contains("quota exceeded"));
    assert!(job.remote_audio_job_id.is_none());
    assert_eq!(job.remote_thumbnail_job_id.as_deref(), Some("remote-1"));
    assert_eq!(harness.orchestrator.limiter_stats().active_count, 0);
}

#[tokio::test]
async fn test_audio_job_id_stored_before_slow_thumbnail_create() {
    let harness = TestHarness::new(1);
    harness.audio_succeeds();
    harness.thumbnail.delay_creates(Duration::from_secs(60));

    let receipt = harness.orchestrator.submit("Tides").unwrap();
    let job = harness
        .wait_for(&receipt.id, |job| job.remote_audio_job_id.is_some())
        .await;

    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.remote_audio_job_id.as_deref(), Some("remote-1"));
    assert!(job.remote_thumbnail_job_id.is_none());
}

#[tokio::test]
async fn test_completed_audio_without_artifact_fails_job() {
    let harness = TestHarness::new(1);
    harness.audio.set_default_script(vec![ScriptStep::Complete(
        RemoteJobResult::completed(vec![RemoteArtifact::typed("transcript", "/t.txt")], vec![]),
    )]);
    harness.thumbnail_succeeds();

    let receipt = harness.orchestrator.submit("Tides").unwrap();
    let job = harness.wait_for_terminal(&receipt.id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error_detail.as_deref(),
        Some("no audio artifact in completed job")
    );
}

#[tokio::test]
async fn test_audio_failure_stops_thumbnail_polling() {
    let harness = TestHarness::with_config(1, fixtures::fast_generation_config(100_000));
    harness
        .audio
        .set_default_script(vec![ScriptStep::Fail("boom".to_string())]);

    let receipt = harness.orchestrator.submit("Tides").unwrap();
    let job = harness.wait_for_terminal(&receipt.id).await;
    assert_eq!(job.status, JobStatus::Failed);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let calls = harness.thumbnail.status_calls("remote-1");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.thumbnail.status_calls("remote-1"), calls);
}

// =============================================================================
// Submission and admission
// =============================================================================

#[tokio::test]
async fn test_topic_validation() {
    let harness = TestHarness::new(1);

    let err = harness.orchestrator.submit("   ").unwrap_err();
    assert!(matches!(err, SubmitError::InvalidInput(_)));

    let err = harness.orchestrator.submit(&"x".repeat(129)).unwrap_err();
    assert!(matches!(err, SubmitError::InvalidInput(_)));

    harness.audio_succeeds();
    let receipt = harness.orchestrator.submit(&"x".repeat(128)).unwrap();
    assert_eq!(receipt.topic.len(), 128);

    assert_eq!(harness.orchestrator.job_count().unwrap(), 1);
}

#[tokio::test]
async fn test_saturated_jobs_are_queued_and_run_in_order() {
    let harness = TestHarness::new(1);
    harness.audio_succeeds();
    harness.thumbnail_succeeds();

    let a = harness.orchestrator.submit("A").unwrap();
    let b = harness.orchestrator.submit("B").unwrap();
    let c = harness.orchestrator.submit("C").unwrap();

    assert_eq!(a.status, JobStatus::Processing);
    assert_eq!(b.status, JobStatus::Queued);
    assert_eq!(c.status, JobStatus::Queued);

    let stats = harness.orchestrator.limiter_stats();
    assert_eq!(stats.active_count, 1);
    assert_eq!(stats.queued_count, 2);

    for receipt in [&a, &b, &c] {
        let job = harness.wait_for_terminal(&receipt.id).await;
        assert_eq!(job.status, JobStatus::Completed);
    }

    assert_eq!(harness.audio.created_topics(), vec!["A", "B", "C"]);
    assert_eq!(harness.orchestrator.limiter_stats().active_count, 0);
}

#[tokio::test]
async fn test_reject_policy_refuses_when_saturated() {
    let config = podcaster_core::GenerationConfig {
        admission_policy: AdmissionPolicy::Reject,
        ..fixtures::fast_generation_config(100_000)
    };
    let harness = TestHarness::with_config(1, config);

    let first = harness.orchestrator.submit("A").unwrap();
    assert_eq!(first.status, JobStatus::Processing);

    let err = harness.orchestrator.submit("B").unwrap_err();
    assert!(matches!(
        err,
        SubmitError::AtCapacity {
            active: 1,
            capacity: 1
        }
    ));
    assert_eq!(harness.orchestrator.job_count().unwrap(), 1);

    harness.orchestrator.stop();
}

#[tokio::test]
async fn test_raising_capacity_admits_queued_job() {
    let harness = TestHarness::with_config(1, fixtures::fast_generation_config(100_000));

    let a = harness.orchestrator.submit("A").unwrap();
    let b = harness.orchestrator.submit("B").unwrap();
    assert_eq!(b.status, JobStatus::Queued);
    harness
        .wait_for(&a.id, |job| job.remote_audio_job_id.is_some())
        .await;

    let stats = harness.orchestrator.set_capacity(2).unwrap();
    assert_eq!(stats.capacity, 2);
    assert_eq!(stats.active_count, 2);
    assert_eq!(stats.queued_count, 0);

    let job = harness
        .wait_for(&b.id, |job| job.remote_audio_job_id.is_some())
        .await;
    assert_eq!(job.status, JobStatus::Processing);

    assert!(harness.orchestrator.set_capacity(0).is_err());
    assert_eq!(harness.orchestrator.limiter_stats().capacity, 2);

    harness.orchestrator.stop();
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_stop_cancels_running_and_queued_jobs() {
    let harness = TestHarness::with_config(1, fixtures::fast_generation_config(100_000));

    let running = harness.orchestrator.submit("A").unwrap();
    let queued = harness.orchestrator.submit("B").unwrap();
    harness
        .wait_for(&running.id, |job| job.remote_audio_job_id.is_some())
        .await;

    harness.orchestrator.stop();
    assert!(harness.orchestrator.is_stopped());

    for receipt in [&running, &queued] {
        let job = harness.wait_for_terminal(&receipt.id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(
            job.error_detail.as_deref(),
            Some("generation cancelled by shutdown")
        );
    }

    let err = harness.orchestrator.submit("C").unwrap_err();
    assert!(matches!(err, SubmitError::Stopped));
    assert_eq!(harness.orchestrator.limiter_stats().active_count, 0);
}
