use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use sqlx::types::Json;
use time::{Duration, PrimitiveDateTime};
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::api;
use crate::core::{config::Settings, state::AppState, time::primitive_now_utc};
use crate::db::models::{
    AnswerRecord, Assessment, AssessmentAttempt, AssessmentSnapshot, Question, QuestionOption,
    QuestionWithOptions,
};
use crate::db::types::{AttemptStatus, QuestionType};
use crate::services::integrity::IntegrityRecorder;
use crate::store::memory::MemoryStore;
use crate::store::EngineStore;

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    pub(crate) store: Arc<MemoryStore>,
    shutdown_tx: watch::Sender<bool>,
    recorder_handle: tokio::task::JoinHandle<()>,
    _guard: OwnedMutexGuard<()>,
}

impl TestContext {
    /// Stops the integrity writer and waits until its queue is flushed.
    pub(crate) async fn flush_recorder(self) -> Arc<MemoryStore> {
        self.shutdown_tx.send(true).ok();
        self.recorder_handle.await.expect("recorder task");
        self.store
    }
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("EXAMGATE_ENV", "test");
    std::env::set_var("EXAMGATE_STRICT_CONFIG", "0");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::set_var("EXPIRY_SWEEP_INTERVAL_SECONDS", "1");
    std::env::set_var("INTEGRITY_QUEUE_CAPACITY", "64");
}

pub(crate) async fn setup_test_context() -> TestContext {
    let guard = env_lock().await;
    set_test_env();

    let settings = Settings::load().expect("settings");
    let store = Arc::new(MemoryStore::new());
    let engine_store: Arc<dyn EngineStore> = store.clone();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (recorder, recorder_handle) = IntegrityRecorder::spawn(
        engine_store.clone(),
        settings.engine().recorder_queue_capacity,
        shutdown_rx,
    );

    let state = AppState::new(settings, engine_store, recorder);
    let app = api::router::router(state.clone());

    TestContext { state, app, store, shutdown_tx, recorder_handle, _guard: guard }
}

pub(crate) struct QuestionSpec {
    pub(crate) question_type: QuestionType,
    pub(crate) points: f64,
    /// Reference answer for identification questions.
    pub(crate) correct_answer: Option<String>,
    /// Option ids and their correctness, for choice questions.
    pub(crate) options: Vec<(String, bool)>,
}

pub(crate) fn multiple_choice(points: f64, correct: &str, wrong: &[&str]) -> QuestionSpec {
    let mut options = vec![(correct.to_string(), true)];
    options.extend(wrong.iter().map(|id| (id.to_string(), false)));
    QuestionSpec { question_type: QuestionType::MultipleChoice, points, correct_answer: None, options }
}

pub(crate) fn checkbox(points: f64, correct: &[&str], wrong: &[&str]) -> QuestionSpec {
    let mut options: Vec<(String, bool)> =
        correct.iter().map(|id| (id.to_string(), true)).collect();
    options.extend(wrong.iter().map(|id| (id.to_string(), false)));
    QuestionSpec { question_type: QuestionType::Checkbox, points, correct_answer: None, options }
}

pub(crate) fn identification(points: f64, accepted: &str) -> QuestionSpec {
    QuestionSpec {
        question_type: QuestionType::Identification,
        points,
        correct_answer: Some(accepted.to_string()),
        options: Vec::new(),
    }
}

pub(crate) async fn seed_assessment(
    store: &MemoryStore,
    assessment_id: &str,
    time_limit_minutes: Option<i32>,
    passing_score: f64,
    max_attempts: i32,
    questions: Vec<QuestionSpec>,
) -> AssessmentSnapshot {
    let now = primitive_now_utc();
    let assessment = Assessment {
        id: assessment_id.to_string(),
        course_id: "course-1".to_string(),
        title: format!("Assessment {assessment_id}"),
        description: None,
        time_limit_minutes,
        passing_score,
        max_attempts,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    let questions = questions
        .into_iter()
        .enumerate()
        .map(|(index, spec)| {
            let question_id = format!("{assessment_id}-q{}", index + 1);
            let options = spec
                .options
                .into_iter()
                .enumerate()
                .map(|(option_index, (option_id, is_correct))| QuestionOption {
                    id: option_id,
                    question_id: question_id.clone(),
                    text: format!("Option {option_index}"),
                    is_correct,
                    order_index: option_index as i32,
                })
                .collect();
            QuestionWithOptions {
                question: Question {
                    id: question_id,
                    assessment_id: assessment_id.to_string(),
                    question_type: spec.question_type,
                    prompt: format!("Question {}", index + 1),
                    points: spec.points,
                    order_index: index as i32,
                    correct_answer: spec.correct_answer,
                    created_at: now,
                },
                options,
            }
        })
        .collect();

    let snapshot = AssessmentSnapshot { assessment, questions };
    store.put_assessment(snapshot.clone()).await;
    snapshot
}

pub(crate) async fn insert_attempt(
    store: &MemoryStore,
    assessment_id: &str,
    trainee_id: &str,
    attempt_number: i32,
    status: AttemptStatus,
    started_minutes_ago: i64,
    time_limit_minutes: Option<i32>,
) -> AssessmentAttempt {
    let now = primitive_now_utc();
    let started_at = now - Duration::minutes(started_minutes_ago);
    let expires_at: Option<PrimitiveDateTime> =
        time_limit_minutes.map(|minutes| started_at + Duration::minutes(minutes as i64));

    let attempt = AssessmentAttempt {
        id: Uuid::new_v4().to_string(),
        assessment_id: assessment_id.to_string(),
        trainee_id: trainee_id.to_string(),
        attempt_number,
        status,
        started_at,
        submitted_at: None,
        expires_at,
        score: None,
        percentage: None,
        is_passed: None,
        answers: Json(Vec::<AnswerRecord>::new()),
        ip_address: None,
        user_agent: None,
        created_at: started_at,
        updated_at: started_at,
    };
    store.insert_attempt_unchecked(attempt.clone()).await;
    attempt
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
