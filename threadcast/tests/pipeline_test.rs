use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use threadcast::llm::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};
use threadcast::news::NewsSearch;
use threadcast::parser::PostBatch;
use threadcast::pipeline::{run_generator, run_publisher, GeneratorSettings, NewsSettings, PublisherSettings};
use threadcast::publish::PublishSettings;
use threadcast::social::{MediaId, PostId, SocialClient, SocialError};
use threadcast::Error;

struct CannedLlm {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl CannedLlm {
    fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl LlmProvider for CannedLlm {
    async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
        self.prompts.lock().unwrap().push(request.prompt);
        match &self.reply {
            Ok(content) => Ok(LlmResponse {
                content: content.clone(),
                usage: UsageMetadata::default(),
                model: "canned".to_string(),
            }),
            Err(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }
}

struct FixedNews(Vec<&'static str>);

#[async_trait::async_trait]
impl NewsSearch for FixedNews {
    async fn search(&self, _query: &str, max_results: usize) -> anyhow::Result<Vec<String>> {
        Ok(self.0.iter().take(max_results).map(|s| s.to_string()).collect())
    }
}

struct Workspace {
    _root: tempfile::TempDir,
    prompt_file: PathBuf,
    output_dir: PathBuf,
}

fn workspace(prompt: &str) -> Workspace {
    let root = tempfile::tempdir().unwrap();
    let prompt_file = root.path().join("prompt.txt");
    std::fs::write(&prompt_file, prompt).unwrap();
    let output_dir = root.path().join("generated_posts");
    Workspace {
        prompt_file,
        output_dir,
        _root: root,
    }
}

fn generator_settings(ws: &Workspace, news: Option<NewsSettings>) -> GeneratorSettings {
    GeneratorSettings {
        prompt_file: ws.prompt_file.clone(),
        output_dir: ws.output_dir.clone(),
        max_tokens: Some(500),
        news,
    }
}

fn artifacts(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn fenced_reply_is_parsed_and_saved() {
    let ws = workspace("Write two posts about Rust.");
    let llm = CannedLlm::replying("```json\n[\"one\", \"two\"]\n```");

    let generated = run_generator(&llm, None, &generator_settings(&ws, None))
        .await
        .unwrap();

    assert_eq!(generated.batch.posts(), &["one".to_string(), "two".to_string()]);
    assert_eq!(llm.last_prompt(), "Write two posts about Rust.");

    let name = generated.artifact.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("raw_tweets_") && name.ends_with(".md"), "{}", name);
    // the artifact keeps the model's own JSON text, without the fence
    assert_eq!(
        std::fs::read_to_string(&generated.artifact).unwrap(),
        "[\"one\", \"two\"]"
    );
}

#[tokio::test]
async fn object_reply_is_a_format_error_and_writes_nothing() {
    let ws = workspace("prompt");
    let llm = CannedLlm::replying("{\"posts\": [\"one\"]}");

    let err = run_generator(&llm, None, &generator_settings(&ws, None))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Format(_)));
    assert_eq!(err.exit_code(), 1);
    assert!(artifacts(&ws.output_dir).is_empty());
}

#[tokio::test]
async fn endpoint_failure_is_a_generation_error() {
    let ws = workspace("prompt");
    let llm = CannedLlm::failing("LLM API error 500: upstream down");

    let err = run_generator(&llm, None, &generator_settings(&ws, None))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Generation(_)));
    assert!(err.to_string().contains("upstream down"));
    assert!(artifacts(&ws.output_dir).is_empty());
}

#[tokio::test]
async fn missing_prompt_file_fails_before_the_model_is_called() {
    let ws = workspace("prompt");
    let llm = CannedLlm::replying("[]");
    let mut settings = generator_settings(&ws, None);
    settings.prompt_file = ws.output_dir.join("nope.txt");

    let err = run_generator(&llm, None, &settings).await.unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert!(llm.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn news_headlines_prefix_the_prompt() {
    let ws = workspace("Write posts.");
    let llm = CannedLlm::replying("[\"post\"]");
    let news = FixedNews(vec!["Headline A", "Headline B", "Headline C"]);
    let settings = generator_settings(
        &ws,
        Some(NewsSettings {
            query: "rust".to_string(),
            max_results: 2,
            header: "Recent news:".to_string(),
        }),
    );

    run_generator(&llm, Some(&news), &settings).await.unwrap();

    assert_eq!(
        llm.last_prompt(),
        "Recent news:\n- Headline A\n- Headline B\n\nWrite posts."
    );
}

#[derive(Default)]
struct RecordingClient {
    posts: Mutex<Vec<(String, Option<String>, Option<String>)>>,
    uploads: Mutex<Vec<PathBuf>>,
}

#[async_trait::async_trait]
impl SocialClient for RecordingClient {
    async fn create_post(
        &self,
        text: &str,
        media: Option<&MediaId>,
        reply_to: Option<&PostId>,
    ) -> Result<PostId, SocialError> {
        let mut posts = self.posts.lock().unwrap();
        posts.push((
            text.to_string(),
            media.map(|m| m.0.clone()),
            reply_to.map(|p| p.0.clone()),
        ));
        Ok(PostId(format!("{}", posts.len())))
    }

    async fn upload_media(&self, path: &Path) -> Result<MediaId, SocialError> {
        self.uploads.lock().unwrap().push(path.to_path_buf());
        Ok(MediaId("img".to_string()))
    }
}

fn publisher_settings(image_dir: Option<PathBuf>) -> PublisherSettings {
    PublisherSettings {
        publish: PublishSettings {
            inter_post_delay: Duration::ZERO,
            retry_backoff: Duration::ZERO,
            ..PublishSettings::default()
        },
        image_dir,
        jitter: false,
    }
}

#[tokio::test]
async fn empty_batch_publishes_nothing() {
    let client = RecordingClient::default();
    let report = run_publisher(&client, &PostBatch::new(vec![]), &publisher_settings(None))
        .await
        .unwrap();

    assert!(report.results.is_empty());
    assert!(client.posts.lock().unwrap().is_empty());
    assert!(client.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn image_from_directory_goes_on_first_post() {
    let images = tempfile::tempdir().unwrap();
    std::fs::write(images.path().join("cover.jpg"), b"jpeg").unwrap();

    let client = RecordingClient::default();
    let batch = PostBatch::new(vec!["first".to_string(), "second".to_string()]);
    let report = run_publisher(
        &client,
        &batch,
        &publisher_settings(Some(images.path().to_path_buf())),
    )
    .await
    .unwrap();

    assert_eq!(report.published(), 2);
    assert_eq!(
        *client.uploads.lock().unwrap(),
        vec![images.path().join("cover.jpg")]
    );
    assert_eq!(
        *client.posts.lock().unwrap(),
        vec![
            ("first".to_string(), Some("img".to_string()), None),
            ("second".to_string(), None, Some("1".to_string())),
        ]
    );
}

#[tokio::test]
async fn missing_image_directory_still_publishes() {
    let client = RecordingClient::default();
    let batch = PostBatch::new(vec!["solo".to_string()]);
    let report = run_publisher(
        &client,
        &batch,
        &publisher_settings(Some(PathBuf::from("/definitely/not/here"))),
    )
    .await
    .unwrap();

    assert_eq!(report.published(), 1);
    assert_eq!(
        *client.posts.lock().unwrap(),
        vec![("solo".to_string(), None, None)]
    );
}
