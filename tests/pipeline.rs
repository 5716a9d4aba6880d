use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use training_video::api::{ImageSearch, LinkProbe, ScriptProposer};
use training_video::error::{PipelineError, ProviderError, RenderError, SubtitleError};
use training_video::render::{JobStatus, RenderApi, RenderJob, RenderJobClient, VideoRequest};
use training_video::retry::{CancelToken, RetryPolicy};
use training_video::srt::parse_timestamp;
use training_video::subtitle::{CaptionStyle, MediaRenderer, SubtitleCompositor};
use training_video::visuals::VisualResolver;
use training_video::{Pipeline, PipelineOutcome};

const ONE_SCENE: &str = r#"{"title":"T","description":"D","scenes":[{"index":1,"title":"S1","narration":"Hello world","visual_descriptor":"ai"}]}"#;
const FOUND_IMAGE: &str = "https://images.example.com/ai.jpg";

struct AllLive;

#[async_trait]
impl LinkProbe for AllLive {
    async fn is_live(&self, _url: &str) -> bool {
        true
    }
}

#[derive(Clone, Default)]
struct RecordingSearch {
    terms: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ImageSearch for RecordingSearch {
    fn name(&self) -> &'static str {
        "stock"
    }

    async fn search(&self, term: &str) -> Result<Option<String>, ProviderError> {
        self.terms.lock().unwrap().push(term.to_string());
        Ok(Some(FOUND_IMAGE.to_string()))
    }
}

#[derive(Default)]
struct Calls {
    requests: Vec<VideoRequest>,
    status_queries: u32,
}

struct MockRender {
    key: bool,
    statuses: Mutex<VecDeque<JobStatus>>,
    download_ok: bool,
    calls: Arc<Mutex<Calls>>,
}

impl MockRender {
    fn new(statuses: &[JobStatus]) -> Self {
        Self {
            key: true,
            statuses: Mutex::new(statuses.iter().copied().collect()),
            download_ok: true,
            calls: Arc::default(),
        }
    }
}

#[async_trait]
impl RenderApi for MockRender {
    fn has_credentials(&self) -> bool {
        self.key
    }

    async fn create_video(&self, request: &VideoRequest) -> Result<String, RenderError> {
        self.calls.lock().unwrap().requests.push(request.clone());
        Ok("job-1".to_string())
    }

    async fn video_status(&self, job_id: &str) -> Result<RenderJob, RenderError> {
        self.calls.lock().unwrap().status_queries += 1;
        let status = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(JobStatus::InProgress);
        let download_url = (status == JobStatus::Complete)
            .then(|| format!("https://cdn.example.com/{job_id}.mp4"));
        Ok(RenderJob {
            job_id: job_id.to_string(),
            status,
            download_url,
        })
    }

    async fn download_into(
        &self,
        _url: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, RenderError> {
        if !self.download_ok {
            return Err(RenderError::Download("HTTP 403".into()));
        }
        sink.write_all(b"rendered video").await?;
        Ok(14)
    }

    fn status_page(&self, job_id: &str) -> String {
        format!("https://app.example.com/video/{job_id}")
    }
}

#[derive(Clone)]
struct MockMedia {
    duration: Duration,
    fail_encode: bool,
    cue_text: Arc<Mutex<Option<String>>>,
}

impl MockMedia {
    fn new(duration: Duration) -> Self {
        Self {
            duration,
            fail_encode: false,
            cue_text: Arc::default(),
        }
    }
}

#[async_trait]
impl MediaRenderer for MockMedia {
    async fn duration(&self, _video: &Path) -> Result<Duration, SubtitleError> {
        Ok(self.duration)
    }

    async fn burn_in(
        &self,
        _video: &Path,
        cue_file: &Path,
        out: &Path,
        _style: &CaptionStyle,
    ) -> Result<(), SubtitleError> {
        *self.cue_text.lock().unwrap() = Some(tokio::fs::read_to_string(cue_file).await?);
        if self.fail_encode {
            return Err(SubtitleError::Tool {
                tool: "ffmpeg",
                detail: "encoder missing".into(),
            });
        }
        tokio::fs::write(out, b"captioned").await?;
        Ok(())
    }
}

struct CannedProposer(&'static str);

#[async_trait]
impl ScriptProposer for CannedProposer {
    async fn propose(&self, _request: &str) -> Result<String, ProviderError> {
        Ok(self.0.to_string())
    }
}

fn pipeline(
    api: MockRender,
    media: MockMedia,
    search: RecordingSearch,
    out: &Path,
    policy: RetryPolicy,
) -> Pipeline<MockRender, MockMedia> {
    let resolver = VisualResolver::new(Box::new(AllLive)).with_provider(Box::new(search));
    let render = RenderJobClient::new(api, policy).with_seed(7);
    Pipeline::new(resolver, render, out).with_compositor(Some(SubtitleCompositor::new(media)))
}

fn quick_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::ZERO)
}

#[tokio::test]
async fn single_scene_ends_captioned_with_one_full_length_window() {
    let tmp = tempfile::tempdir().unwrap();
    let api = MockRender::new(&[JobStatus::Complete]);
    let calls = api.calls.clone();
    let media = MockMedia::new(Duration::from_millis(12_500));
    let cue_text = media.cue_text.clone();
    let search = RecordingSearch::default();
    let terms = search.terms.clone();
    let mut pipeline = pipeline(api, media, search, tmp.path(), quick_policy());

    let (script, outcome) = pipeline.run(ONE_SCENE, &CancelToken::new()).await.unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::Captioned(tmp.path().join("training_job-1_subtitled.mp4"))
    );
    assert_eq!(script.scenes[0].visual_descriptor, FOUND_IMAGE);
    assert_eq!(*terms.lock().unwrap(), vec!["ai".to_string()]);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.status_queries, 1);
    assert_eq!(calls.requests.len(), 1);
    let clips = &calls.requests[0].input;
    assert_eq!(clips.len(), 1);
    assert_eq!(clips[0].script_text, "Hello world");
    assert_eq!(clips[0].background, FOUND_IMAGE);

    let cues = cue_text.lock().unwrap().clone().unwrap();
    let blocks: Vec<&str> = cues.trim_end().split("\n\n").collect();
    assert_eq!(blocks.len(), 1);
    let lines: Vec<&str> = blocks[0].lines().collect();
    assert_eq!(lines[0], "1");
    let (start, end) = lines[1].split_once(" --> ").unwrap();
    assert_eq!(parse_timestamp(start), Some(Duration::ZERO));
    assert_eq!(parse_timestamp(end), Some(Duration::from_millis(12_500)));
    assert_eq!(lines[2], "Hello world");

    assert_eq!(
        tokio::fs::read(tmp.path().join("training_job-1.mp4")).await.unwrap(),
        b"rendered video"
    );
}

#[tokio::test]
async fn proposer_output_in_fences_is_generated_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let api = MockRender::new(&[JobStatus::Queued, JobStatus::Complete]);
    let media = MockMedia::new(Duration::from_secs(30));
    let mut pipeline = pipeline(api, media, RecordingSearch::default(), tmp.path(), quick_policy());
    let proposer = CannedProposer(
        "Voici le script :\n```json\n{\"titre_formation\":\"IA\",\"description\":\"D\",\"scenes\":[{\"numero\":1,\"titre\":\"Intro\",\"voix_off\":\"Bonjour\",\"elements_visuels\":\"ai\"}]}\n```",
    );

    let (script, outcome) = pipeline
        .generate(&proposer, "une formation sur l'IA", &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(script.title, "IA");
    assert_eq!(script.scenes[0].narration, "Bonjour");
    assert!(matches!(outcome, PipelineOutcome::Captioned(_)));
}

#[tokio::test]
async fn missing_credential_fails_before_any_network_call() {
    let tmp = tempfile::tempdir().unwrap();
    let mut api = MockRender::new(&[JobStatus::Complete]);
    api.key = false;
    let calls = api.calls.clone();
    let search = RecordingSearch::default();
    let terms = search.terms.clone();
    let mut pipeline = pipeline(
        api,
        MockMedia::new(Duration::from_secs(10)),
        search,
        tmp.path(),
        quick_policy(),
    );

    let err = pipeline.run(ONE_SCENE, &CancelToken::new()).await.unwrap_err();

    assert!(matches!(err, PipelineError::Config(_)));
    assert!(terms.lock().unwrap().is_empty());
    assert!(calls.lock().unwrap().requests.is_empty());
}

#[tokio::test]
async fn malformed_response_is_a_schema_error() {
    let tmp = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline(
        MockRender::new(&[]),
        MockMedia::new(Duration::from_secs(10)),
        RecordingSearch::default(),
        tmp.path(),
        quick_policy(),
    );

    let err = pipeline
        .run("I could not produce a script, sorry.", &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Schema(_)));
}

#[tokio::test(start_paused = true)]
async fn exhausted_polling_points_at_the_status_page() {
    let tmp = tempfile::tempdir().unwrap();
    let api = MockRender::new(&[]);
    let calls = api.calls.clone();
    let mut pipeline = pipeline(
        api,
        MockMedia::new(Duration::from_secs(10)),
        RecordingSearch::default(),
        tmp.path(),
        RetryPolicy::new(4, Duration::from_secs(10)),
    );

    let start = tokio::time::Instant::now();
    let (_, outcome) = pipeline.run(ONE_SCENE, &CancelToken::new()).await.unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::Pending("https://app.example.com/video/job-1".into())
    );
    assert_eq!(calls.lock().unwrap().status_queries, 4);
    assert_eq!(start.elapsed(), Duration::from_secs(30));
}

#[tokio::test]
async fn failed_job_is_reported_without_download() {
    let tmp = tempfile::tempdir().unwrap();
    let mut pipeline = pipeline(
        MockRender::new(&[JobStatus::InProgress, JobStatus::Failed]),
        MockMedia::new(Duration::from_secs(10)),
        RecordingSearch::default(),
        tmp.path(),
        quick_policy(),
    );

    let (_, outcome) = pipeline.run(ONE_SCENE, &CancelToken::new()).await.unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::RenderFailed("render job job-1 failed".into())
    );
    assert!(!tmp.path().join("training_job-1.mp4").exists());
}

#[tokio::test]
async fn download_error_keeps_the_remote_link() {
    let tmp = tempfile::tempdir().unwrap();
    let mut api = MockRender::new(&[JobStatus::Complete]);
    api.download_ok = false;
    let mut pipeline = pipeline(
        api,
        MockMedia::new(Duration::from_secs(10)),
        RecordingSearch::default(),
        tmp.path(),
        quick_policy(),
    );

    let (_, outcome) = pipeline.run(ONE_SCENE, &CancelToken::new()).await.unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::RemoteOnly("https://cdn.example.com/job-1.mp4".into())
    );
    assert!(!tmp.path().join("training_job-1.part").exists());
}

#[tokio::test]
async fn subtitle_failure_returns_the_downloaded_video() {
    let tmp = tempfile::tempdir().unwrap();
    let mut media = MockMedia::new(Duration::from_secs(10));
    media.fail_encode = true;
    let mut pipeline = pipeline(
        MockRender::new(&[JobStatus::Complete]),
        media,
        RecordingSearch::default(),
        tmp.path(),
        quick_policy(),
    );

    let (_, outcome) = pipeline.run(ONE_SCENE, &CancelToken::new()).await.unwrap();

    let video: PathBuf = tmp.path().join("training_job-1.mp4");
    assert_eq!(outcome, PipelineOutcome::Uncaptioned(video.clone()));
    assert_eq!(tokio::fs::read(&video).await.unwrap(), b"rendered video");
}

#[tokio::test]
async fn cancelled_token_stops_before_submission() {
    let tmp = tempfile::tempdir().unwrap();
    let api = MockRender::new(&[]);
    let calls = api.calls.clone();
    let mut pipeline = pipeline(
        api,
        MockMedia::new(Duration::from_secs(10)),
        RecordingSearch::default(),
        tmp.path(),
        RetryPolicy::new(30, Duration::from_secs(10)),
    );
    let cancel = CancelToken::new();
    cancel.cancel();

    let (_, outcome) = pipeline.run(ONE_SCENE, &cancel).await.unwrap();

    assert_eq!(outcome, PipelineOutcome::Cancelled);
    let calls = calls.lock().unwrap();
    assert!(calls.requests.is_empty());
    assert_eq!(calls.status_queries, 0);
}

#[tokio::test]
async fn intro_clip_gets_the_first_caption() {
    let tmp = tempfile::tempdir().unwrap();
    let media = MockMedia::new(Duration::from_secs(20));
    let cue_text = media.cue_text.clone();
    let resolver = VisualResolver::new(Box::new(AllLive))
        .with_provider(Box::new(RecordingSearch::default()));
    let render = RenderJobClient::new(MockRender::new(&[JobStatus::Complete]), quick_policy())
        .with_intro_clip(true);
    let mut pipeline = Pipeline::new(resolver, render, tmp.path())
        .with_compositor(Some(SubtitleCompositor::new(media)));

    let (_, outcome) = pipeline.run(ONE_SCENE, &CancelToken::new()).await.unwrap();

    assert!(matches!(outcome, PipelineOutcome::Captioned(_)));
    let cues = cue_text.lock().unwrap().clone().unwrap();
    let blocks: Vec<&str> = cues.trim_end().split("\n\n").collect();
    assert_eq!(blocks.len(), 2);
    assert_eq!(
        blocks[0],
        "1\n00:00:00,000 --> 00:00:10,000\nBienvenue dans cette formation : T."
    );
    assert_eq!(blocks[1], "2\n00:00:10,000 --> 00:00:20,000\nHello world");
}
