use api_lib::web::{self, chat::SendMessageResponse, state::AppState};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use std::sync::{Arc, Mutex};
use student_helper_core::domain::ANONYMOUS_USER_ID;
use student_helper_core::ports::{
    ChatCompletionService, ChatError, ChatResult, Clock, ConversationStore, PortError, PortResult,
};
use student_helper_core::{ChatMessage, Completion, ContextCategory, Conversation, PLACEHOLDER_COMPLETION};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use uuid::Uuid;

//=========================================================================================
// Port Fakes
//=========================================================================================

#[derive(Default)]
struct InMemoryStore {
    conversations: Mutex<Vec<Conversation>>,
    messages: Mutex<Vec<ChatMessage>>,
    fail_writes: bool,
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn latest_conversation(
        &self,
        user_id: Uuid,
        category: ContextCategory,
    ) -> PortResult<Option<Conversation>> {
        let conversations = self.conversations.lock().unwrap();
        Ok(conversations
            .iter()
            .filter(|c| c.user_id == user_id && c.context_category == category)
            .max_by_key(|c| c.updated_at)
            .cloned())
    }

    async fn save_exchange(
        &self,
        conversation: &Conversation,
        messages: &[ChatMessage],
    ) -> PortResult<()> {
        if self.fail_writes {
            return Err(PortError::Unexpected("database is down".to_string()));
        }
        let mut conversations = self.conversations.lock().unwrap();
        conversations.retain(|c| c.id != conversation.id);
        conversations.push(conversation.clone());
        self.messages.lock().unwrap().extend_from_slice(messages);
        Ok(())
    }
}

struct ScriptedChat {
    outcome: ChatResult<Completion>,
    seen: Mutex<Vec<(String, ContextCategory)>>,
}

impl ScriptedChat {
    fn answering(outcome: ChatResult<Completion>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ChatCompletionService for ScriptedChat {
    async fn get_completion(
        &self,
        message: &str,
        category: ContextCategory,
        _cancel: &CancellationToken,
    ) -> ChatResult<Completion> {
        self.seen.lock().unwrap().push((message.to_string(), category));
        self.outcome.clone()
    }

    fn model_name(&self) -> &str {
        "gigachat"
    }
}

struct FixedClock(Mutex<DateTime<Utc>>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
}

fn app(store: Arc<InMemoryStore>, chat: Arc<ScriptedChat>, clock: Arc<FixedClock>) -> Router {
    web::router(Arc::new(AppState {
        conversations: store,
        chat,
        clock,
        shutdown: CancellationToken::new(),
    }))
}

fn chat_request(user_id: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/helper/ai/chat")
        .header("content-type", "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn read_answer(response: axum::response::Response) -> SendMessageResponse {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

//=========================================================================================
// Tests
//=========================================================================================

#[tokio::test]
async fn answer_is_returned_and_logged() {
    let store = Arc::new(InMemoryStore::default());
    let chat = ScriptedChat::answering(Ok(Completion::Generated("x = 2".to_string())));
    let clock = Arc::new(FixedClock(Mutex::new(start_time())));
    let user = Uuid::new_v4();

    let response = app(store.clone(), chat.clone(), clock)
        .oneshot(chat_request(
            Some(&user.to_string()),
            json!({ "message": "Solve 2x = 4", "context_type": "MATH" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let answer = read_answer(response).await;
    assert_eq!(answer.answer, "x = 2");
    assert_eq!(answer.created_at, start_time());

    assert_eq!(
        chat.seen.lock().unwrap().as_slice(),
        &[("Solve 2x = 4".to_string(), ContextCategory::Math)]
    );

    let conversations = store.conversations.lock().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].id, answer.conversation_id);
    assert_eq!(conversations[0].title, "Solve 2x = 4");

    let messages = store.messages.lock().unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].is_user_message);
    assert_eq!(messages[0].ai_model, "user");
    assert!(!messages[1].is_user_message);
    assert_eq!(messages[1].ai_model, "gigachat");
    assert_eq!(messages[1].content, "x = 2");
}

#[tokio::test]
async fn unknown_context_type_falls_back_to_general() {
    let store = Arc::new(InMemoryStore::default());
    let chat = ScriptedChat::answering(Ok(Completion::Generated("hi".to_string())));
    let clock = Arc::new(FixedClock(Mutex::new(start_time())));

    let response = app(store, chat.clone(), clock)
        .oneshot(chat_request(
            Some(&Uuid::new_v4().to_string()),
            json!({ "message": "hello", "context_type": "astrology" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(chat.seen.lock().unwrap()[0].1, ContextCategory::General);
}

#[tokio::test]
async fn recent_conversation_is_continued_and_stale_one_replaced() {
    let store = Arc::new(InMemoryStore::default());
    let chat = ScriptedChat::answering(Ok(Completion::Generated("ok".to_string())));
    let clock = Arc::new(FixedClock(Mutex::new(start_time())));
    let user = Uuid::new_v4().to_string();
    let app = app(store.clone(), chat, clock.clone());

    let first = read_answer(
        app.clone()
            .oneshot(chat_request(Some(&user), json!({ "message": "one" })))
            .await
            .unwrap(),
    )
    .await;

    *clock.0.lock().unwrap() += Duration::minutes(30);
    let second = read_answer(
        app.clone()
            .oneshot(chat_request(Some(&user), json!({ "message": "two" })))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(first.conversation_id, second.conversation_id);

    *clock.0.lock().unwrap() += Duration::minutes(90);
    let third = read_answer(
        app.oneshot(chat_request(Some(&user), json!({ "message": "three" })))
            .await
            .unwrap(),
    )
    .await;
    assert_ne!(second.conversation_id, third.conversation_id);

    assert_eq!(store.conversations.lock().unwrap().len(), 2);
    assert_eq!(store.messages.lock().unwrap().len(), 6);
}

#[tokio::test]
async fn placeholder_answer_is_a_success() {
    let store = Arc::new(InMemoryStore::default());
    let chat = ScriptedChat::answering(Ok(Completion::Placeholder));
    let clock = Arc::new(FixedClock(Mutex::new(start_time())));

    let response = app(store, chat, clock)
        .oneshot(chat_request(Some(&Uuid::new_v4().to_string()), json!({ "message": "?" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_answer(response).await.answer, PLACEHOLDER_COMPLETION);
}

#[tokio::test]
async fn chat_failure_is_reported_as_unavailable() {
    let store = Arc::new(InMemoryStore::default());
    let chat = ScriptedChat::answering(Err(ChatError::CredentialAcquisitionFailed(
        "token endpoint returned 401".to_string(),
    )));
    let clock = Arc::new(FixedClock(Mutex::new(start_time())));

    let response = app(store.clone(), chat, clock)
        .oneshot(chat_request(Some(&Uuid::new_v4().to_string()), json!({ "message": "hi" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(store.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn storage_failure_still_returns_the_answer() {
    let store = Arc::new(InMemoryStore {
        fail_writes: true,
        ..Default::default()
    });
    let chat = ScriptedChat::answering(Ok(Completion::Generated("still here".to_string())));
    let clock = Arc::new(FixedClock(Mutex::new(start_time())));

    let response = app(store, chat, clock)
        .oneshot(chat_request(Some(&Uuid::new_v4().to_string()), json!({ "message": "hi" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_answer(response).await.answer, "still here");
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let chat = ScriptedChat::answering(Ok(Completion::Generated("unused".to_string())));
    let response = app(
        Arc::new(InMemoryStore::default()),
        chat.clone(),
        Arc::new(FixedClock(Mutex::new(start_time()))),
    )
    .oneshot(chat_request(Some(&Uuid::new_v4().to_string()), json!({ "message": "  " })))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(chat.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn caller_identity_is_required() {
    let make_app = || {
        app(
            Arc::new(InMemoryStore::default()),
            ScriptedChat::answering(Ok(Completion::Placeholder)),
            Arc::new(FixedClock(Mutex::new(start_time()))),
        )
    };

    let missing = make_app()
        .oneshot(chat_request(None, json!({ "message": "hi" })))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let malformed = make_app()
        .oneshot(chat_request(Some("not-a-uuid"), json!({ "message": "hi" })))
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::UNAUTHORIZED);

    let anonymous = make_app()
        .oneshot(chat_request(Some(&ANONYMOUS_USER_ID.to_string()), json!({ "message": "hi" })))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_is_public() {
    let response = app(
        Arc::new(InMemoryStore::default()),
        ScriptedChat::answering(Ok(Completion::Placeholder)),
        Arc::new(FixedClock(Mutex::new(start_time()))),
    )
    .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"Healthy");
}
