//! End-to-end report pipeline.
//!
//! Runs the stages strictly in sequence: transcribe the session audio,
//! summarize it, look up matching policies, rerank them, and render the
//! PDF. Transcription failures are fatal; summary and recommendation
//! stages degrade instead of aborting the run.

use std::path::{Path, PathBuf};

use crate::audio::SpeechToTextProvider;
use crate::chat::ChatProvider;
use crate::error::Result;
use crate::openai::OpenAi;
use crate::policy::{self, DEFAULT_CANDIDATE_LIMIT};
use crate::profile::ClientProfile;
use crate::rerank::{self, DEFAULT_MAX_PICKS};
use crate::report::ReportBundle;
use crate::report::font::{FontConfig, FontSet};
use crate::report::pdf::render_pdf;
use crate::summary;

/// Inputs for a single pipeline run.
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Path to the recorded session audio.
    pub audio: PathBuf,
    /// Client profile as a JSON document.
    pub client_json: String,
    /// Optional policy database; skipped entirely when absent.
    pub db: Option<PathBuf>,
    /// Optional free-form search query overriding the profile-derived one.
    pub query: Option<String>,
    /// Output PDF path.
    pub out: PathBuf,
}

/// The batch pipeline, generic over its LLM backends.
#[derive(Debug)]
pub struct Pipeline<C, S> {
    chat: C,
    stt: S,
    stt_model: String,
    fonts: FontConfig,
    candidate_limit: usize,
    max_picks: usize,
    language: Option<String>,
}

impl Pipeline<OpenAi, OpenAi> {
    /// A pipeline backed by a single OpenAI-compatible client for both
    /// chat and transcription.
    #[must_use]
    pub fn openai(client: OpenAi) -> Self {
        let stt_model = client.stt_model().to_owned();
        Self::new(client.clone(), client, stt_model)
    }
}

impl<C, S> Pipeline<C, S>
where
    C: ChatProvider,
    S: SpeechToTextProvider,
{
    /// Creates a pipeline over explicit chat and transcription backends.
    #[must_use]
    pub fn new(chat: C, stt: S, stt_model: impl Into<String>) -> Self {
        Self {
            chat,
            stt,
            stt_model: stt_model.into(),
            fonts: FontConfig::from_env(),
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            max_picks: DEFAULT_MAX_PICKS,
            language: Some("ko".to_owned()),
        }
    }

    /// The chat backend this pipeline summarizes and reranks with.
    #[must_use]
    pub fn chat_backend(&self) -> &C {
        &self.chat
    }

    /// The transcription backend this pipeline runs audio through.
    #[must_use]
    pub fn stt_backend(&self) -> &S {
        &self.stt
    }

    /// Overrides the environment-derived font configuration.
    #[must_use]
    pub fn with_fonts(mut self, fonts: FontConfig) -> Self {
        self.fonts = fonts;
        self
    }

    /// Caps how many policy candidates the database search returns.
    #[must_use]
    pub fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = limit;
        self
    }

    /// Caps how many recommendations the report carries.
    #[must_use]
    pub fn with_max_picks(mut self, max_picks: usize) -> Self {
        self.max_picks = max_picks;
        self
    }

    /// Sets the transcription language hint (`None` lets the model detect).
    #[must_use]
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    /// Runs the whole pipeline and writes the PDF to `args.out`.
    ///
    /// The profile is validated and the fonts are loaded before any
    /// network call is made, so bad inputs fail without spending an
    /// API request.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: invalid profile, unreadable
    /// fonts or audio, a failed transcription, or an unwritable output
    /// path.
    pub async fn run(&self, args: &RunArgs) -> Result<()> {
        let profile = ClientProfile::from_json(&args.client_json)?;
        let fonts = FontSet::load(&self.fonts)?;

        let bundle = self.assemble(&profile, args).await?;
        render_pdf(&bundle, &fonts, &args.out)
    }

    /// Runs every stage up to (not including) PDF rendering.
    ///
    /// # Errors
    ///
    /// Fails when the audio cannot be read or transcribed, or when the
    /// summary request fails outright.
    pub async fn assemble(&self, profile: &ClientProfile, args: &RunArgs) -> Result<ReportBundle> {
        let transcript = self.transcribe(&args.audio).await?;
        tracing::info!(len = transcript.len(), "transcription complete");

        let summary = summary::summarize(&self.chat, profile, &transcript).await?;
        tracing::info!(
            needs = summary.needs.len(),
            risks = summary.risks.len(),
            "summary complete"
        );

        let query = args
            .query
            .clone()
            .unwrap_or_else(|| policy::default_query(profile));
        let candidates = policy::search_candidates(
            args.db.as_deref(),
            profile,
            Some(&query),
            self.candidate_limit,
        )?;
        tracing::info!(count = candidates.len(), %query, "policy search complete");

        let recommendations =
            rerank::rerank(&self.chat, profile, &candidates, self.max_picks).await?;
        tracing::info!(count = recommendations.len(), "rerank complete");

        let consulted_at = chrono::Local::now().format("%Y-%m-%d %H:%M").to_string();
        Ok(ReportBundle::new(
            profile.clone(),
            consulted_at,
            summary,
            recommendations,
        ))
    }

    async fn transcribe(&self, audio: &Path) -> Result<String> {
        let response = self
            .stt
            .transcribe_file(&self.stt_model, audio, self.language.as_deref())
            .await?;
        Ok(response.text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rusqlite::Connection;

    use crate::audio::{TranscriptionRequest, TranscriptionResponse};
    use crate::chat::tests_support::MockChat;
    use crate::error::{Error, LlmError};

    use super::*;

    #[derive(Debug, Default)]
    struct MockStt {
        text: String,
        calls: AtomicUsize,
        fail: bool,
    }

    impl MockStt {
        fn new(text: &str) -> Self {
            Self {
                text: text.to_owned(),
                ..Self::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpeechToTextProvider for MockStt {
        async fn transcribe(&self, _request: &TranscriptionRequest) -> Result<TranscriptionResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LlmError::network("mock transport failure").into());
            }
            Ok(TranscriptionResponse::new(self.text.clone()))
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("soho_pipeline_test");
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn valid_profile_json() -> String {
        r#"{"name":"김철수","biz_type":"요식업","region":"부산","biz_age_months":30}"#.to_owned()
    }

    fn args(audio: PathBuf) -> RunArgs {
        RunArgs {
            audio,
            client_json: valid_profile_json(),
            db: None,
            query: None,
            out: temp_path("out.pdf"),
        }
    }

    fn summary_json() -> String {
        r#"{"summary":"운전자금 상담","needs":["대출 한도 확인"],"risks":["신용점수 하락"]}"#
            .to_owned()
    }

    mod run {
        use super::*;

        #[tokio::test]
        async fn invalid_profile_fails_before_any_provider_call() {
            let chat = MockChat::default();
            let stt = MockStt::new("transcript");
            let pipeline = Pipeline::new(chat, stt, "whisper-1");

            let mut run_args = args(temp_path("missing.wav"));
            run_args.client_json = r#"{"biz_type":"  "}"#.to_owned();

            let err = pipeline.run(&run_args).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
            assert_eq!(pipeline.chat.calls(), 0);
            assert_eq!(pipeline.stt.calls(), 0);
        }

        #[tokio::test]
        async fn missing_fonts_fail_before_any_provider_call() {
            let chat = MockChat::default();
            let stt = MockStt::new("transcript");
            let fonts = FontConfig::new(
                "Missing",
                temp_path("no-such-regular.ttf"),
                temp_path("no-such-bold.ttf"),
            );
            let pipeline = Pipeline::new(chat, stt, "whisper-1").with_fonts(fonts);

            let err = pipeline.run(&args(temp_path("missing.wav"))).await.unwrap_err();
            assert!(matches!(err, Error::Render(_)));
            assert_eq!(pipeline.chat.calls(), 0);
            assert_eq!(pipeline.stt.calls(), 0);
        }
    }

    mod assemble {
        use super::*;

        fn audio_file(name: &str) -> PathBuf {
            let path = temp_path(name);
            std::fs::write(&path, b"RIFF....WAVE").unwrap();
            path
        }

        fn seeded_db(name: &str) -> PathBuf {
            let path = temp_path(name);
            let _ = std::fs::remove_file(&path);
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE policies (
                    id INTEGER PRIMARY KEY, title TEXT, region TEXT, industry TEXT,
                    period TEXT, conditions TEXT, url TEXT, hashtags TEXT, source TEXT
                );
                CREATE VIRTUAL TABLE policies_fts USING fts5(title, conditions);
                INSERT INTO policies (id, title, region, industry, conditions)
                VALUES (1, '부산 소상공인 특별자금', '부산', '요식업', '업력 1년 이상');
                INSERT INTO policies_fts (rowid, title, conditions)
                VALUES (1, '부산 소상공인 특별자금', '업력 1년 이상');",
            )
            .unwrap();
            path
        }

        #[tokio::test]
        async fn happy_path_produces_a_full_bundle() {
            let rerank_json = r#"{"recommendations":[
                {"id":1,"name":"부산 소상공인 특별자금","reason":"지역과 업종이 일치"}
            ]}"#;
            let chat = MockChat::new(vec![summary_json(), rerank_json.to_owned()]);
            let stt = MockStt::new("사장님, 운전자금이 필요하신 상황이군요.");
            let pipeline = Pipeline::new(chat, stt, "whisper-1");

            let mut run_args = args(audio_file("happy.wav"));
            run_args.db = Some(seeded_db("happy.db"));
            run_args.query = Some("부산".to_owned());
            let profile = ClientProfile::from_json(&run_args.client_json).unwrap();

            let bundle = pipeline.assemble(&profile, &run_args).await.unwrap();

            assert_eq!(pipeline.stt.calls(), 1);
            assert_eq!(pipeline.chat.calls(), 2); // summary + rerank
            assert_eq!(bundle.summary, "운전자금 상담");
            assert_eq!(bundle.needs, vec!["대출 한도 확인"]);
            assert_eq!(bundle.recommendations.len(), 1);
            assert_eq!(bundle.recommendations[0].name, "부산 소상공인 특별자금");
            // %Y-%m-%d %H:%M
            assert_eq!(bundle.consulted_at.len(), 16);
        }

        #[tokio::test]
        async fn no_database_skips_search_and_rerank() {
            let chat = MockChat::new(vec![summary_json()]);
            let stt = MockStt::new("상담 내용");
            let pipeline = Pipeline::new(chat, stt, "whisper-1");

            let run_args = args(audio_file("nodb.wav"));
            let profile = ClientProfile::from_json(&run_args.client_json).unwrap();

            let bundle = pipeline.assemble(&profile, &run_args).await.unwrap();

            // No candidates, so the rerank stage never calls the model.
            assert_eq!(pipeline.chat.calls(), 1);
            assert!(bundle.recommendations.is_empty());
        }

        #[tokio::test]
        async fn transcription_failure_is_fatal() {
            let chat = MockChat::new(vec![summary_json()]);
            let stt = MockStt::failing();
            let pipeline = Pipeline::new(chat, stt, "whisper-1");

            let run_args = args(audio_file("fail.wav"));
            let profile = ClientProfile::from_json(&run_args.client_json).unwrap();

            let err = pipeline.assemble(&profile, &run_args).await.unwrap_err();
            assert!(matches!(err, Error::Llm(_)));
            assert_eq!(pipeline.chat.calls(), 0);
        }

        #[tokio::test]
        async fn unreadable_audio_fails_before_any_model_call() {
            let chat = MockChat::new(vec![summary_json()]);
            let stt = MockStt::new("unused");
            let pipeline = Pipeline::new(chat, stt, "whisper-1");

            let run_args = args(temp_path("does-not-exist.wav"));
            let profile = ClientProfile::from_json(&run_args.client_json).unwrap();

            let err = pipeline.assemble(&profile, &run_args).await.unwrap_err();
            assert!(matches!(err, Error::Llm(_)));
            assert_eq!(pipeline.stt.calls(), 0);
            assert_eq!(pipeline.chat.calls(), 0);
        }

        #[tokio::test]
        async fn malformed_summary_degrades_to_raw_text() {
            let chat = MockChat::new(vec!["그냥 자유 서술".to_owned()]);
            let stt = MockStt::new("상담 내용");
            let pipeline = Pipeline::new(chat, stt, "whisper-1");

            let run_args = args(audio_file("degrade.wav"));
            let profile = ClientProfile::from_json(&run_args.client_json).unwrap();

            let bundle = pipeline.assemble(&profile, &run_args).await.unwrap();
            assert_eq!(bundle.summary, "그냥 자유 서술");
            assert!(bundle.needs.is_empty());
        }
    }
}
