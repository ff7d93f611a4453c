//! Test doubles shared by the service and router tests

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use common::session::{InMemoryRevocations, SessionConfig, SessionService};
use tokio::sync::Mutex;

use crate::{
    assistant::{AssistantError, AssistantModel, HistoryTurn},
    conversation::ConversationService,
    repositories::memory::MemoryStore,
    state::AppState,
};

/// One recorded provider call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub history: Vec<HistoryTurn>,
    pub input: String,
}

#[derive(Debug, Clone, Copy)]
enum Behaviour {
    Answer,
    Blank,
    Fail(u16),
    Slow(Duration),
}

/// Assistant that answers deterministically and records what it was sent
pub struct ScriptedAssistant {
    calls: Mutex<Vec<RecordedCall>>,
    behaviour: StdMutex<Behaviour>,
}

impl ScriptedAssistant {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            behaviour: StdMutex::new(Behaviour::Answer),
        }
    }

    /// Reply produced for a given input
    pub fn reply_for(input: &str) -> String {
        format!("Advice on: {}", input)
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub fn fail_with_status(&self, status: u16) {
        self.set(Behaviour::Fail(status));
    }

    pub fn reply_blank(&self) {
        self.set(Behaviour::Blank);
    }

    pub fn delay_replies(&self, delay: Duration) {
        self.set(Behaviour::Slow(delay));
    }

    pub fn recover(&self) {
        self.set(Behaviour::Answer);
    }

    fn set(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }
}

#[async_trait]
impl AssistantModel for ScriptedAssistant {
    async fn reply(&self, history: &[HistoryTurn], input: &str) -> Result<String, AssistantError> {
        self.calls.lock().await.push(RecordedCall {
            history: history.to_vec(),
            input: input.to_string(),
        });

        let behaviour = *self.behaviour.lock().unwrap();
        match behaviour {
            Behaviour::Answer => Ok(Self::reply_for(input)),
            Behaviour::Blank => Ok("   ".to_string()),
            Behaviour::Fail(status) => Err(AssistantError::Status {
                status,
                message: "scripted failure".to_string(),
            }),
            Behaviour::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Self::reply_for(input))
            }
        }
    }
}

/// Session service backed by an in-process revocation list
pub fn test_sessions() -> SessionService {
    let config = SessionConfig {
        secret: "router-test-secret-with-enough-bytes".to_string(),
        ttl_seconds: 3600,
    };
    SessionService::new(&config, Arc::new(InMemoryRevocations::new()))
}

/// Application state over an in-memory store and a scripted assistant
pub struct TestApp {
    pub state: AppState,
    pub store: MemoryStore,
    pub assistant: Arc<ScriptedAssistant>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let assistant = Arc::new(ScriptedAssistant::new());
        let conversations = ConversationService::new(
            Arc::new(store.clone()),
            assistant.clone(),
            Duration::from_secs(5),
        );

        let state = AppState {
            sessions: test_sessions(),
            users: Arc::new(store.clone()),
            conversations,
        };

        Self {
            state,
            store,
            assistant,
        }
    }

    /// Register a user and return a valid bearer token for them
    pub async fn sign_in(&self, email: &str) -> String {
        let user = self.store.add_user(email).await;
        self.state
            .sessions
            .issue(user.id, &user.email)
            .unwrap()
            .token
    }
}
