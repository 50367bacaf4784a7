//! Mock backend for testing.
//!
//! [`MockProvider`] is a queue-based fake that lets tests control
//! exactly what responses and errors a backend returns, without
//! touching the network. It implements [`Provider`], so it works
//! anywhere a real backend does, including behind
//! [`DynProvider`](crate::DynProvider) and inside a
//! [`FailoverProvider`](crate::retry::FailoverProvider).
//!
//! # Usage
//!
//! ```rust
//! use llm_conductor::mock::{MockError, MockProvider};
//! use llm_conductor::{ChatMessage, ChatRequest, ChatResponse, Provider};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mock = MockProvider::new("primary");
//! mock.queue_error(MockError::backend(503, "overloaded"))
//!     .queue_response(ChatResponse::from_text("Hello!"));
//!
//! let request = ChatRequest::new("test-model", vec![ChatMessage::user("hi")]).unwrap();
//! assert!(mock.chat(&request).await.is_err());
//! assert_eq!(mock.chat(&request).await.unwrap().text(), "Hello!");
//! assert_eq!(mock.recorded_calls().len(), 2);
//! # }
//! ```
//!
//! # Why `MockError` instead of `LlmError`?
//!
//! [`LlmError`] contains `Box<dyn Error>` and is not `Clone`, so it can't
//! be stored in a queue or repeated. [`MockError`] mirrors the variants a
//! backend can produce in a cloneable form and converts to `LlmError` at
//! dequeue time.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use crate::chat::ChatResponse;
use crate::error::LlmError;
use crate::provider::{ChatRequest, Provider};

/// A queue-based mock backend for unit and integration tests.
///
/// Push responses with [`queue_response`](Self::queue_response) and
/// errors with [`queue_error`](Self::queue_error). Each call to `chat`
/// pops from the front of the queue. Once the queue is drained, the
/// fallback set with [`always_respond`](Self::always_respond) or
/// [`always_fail`](Self::always_fail) is used, if any.
///
/// Every call records its [`ChatRequest`] for later assertion via
/// [`recorded_calls`](Self::recorded_calls).
///
/// # Panics
///
/// [`chat`](Provider::chat) panics if the queue is empty and no fallback
/// outcome is configured.
pub struct MockProvider {
    name: String,
    queue: Mutex<VecDeque<Result<ChatResponse, MockError>>>,
    fallback: Mutex<Option<Result<ChatResponse, MockError>>>,
    calls: Mutex<Vec<ChatRequest>>,
}

/// Cloneable error subset for mock queuing.
///
/// Use [`queue_error`](MockProvider::queue_error) to enqueue one; it is
/// converted to [`LlmError`] when dequeued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockError {
    /// Maps to [`LlmError::Backend`].
    Backend {
        /// Status code, or `None` when no response was received.
        status: Option<u16>,
        /// Error message.
        message: String,
    },
    /// Maps to [`LlmError::Configuration`].
    Configuration(String),
}

impl MockError {
    /// Shorthand for a backend failure with a status code.
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status: Some(status),
            message: message.into(),
        }
    }

    fn into_llm_error(self) -> LlmError {
        match self {
            Self::Backend { status, message } => LlmError::Backend { status, message },
            Self::Configuration(msg) => LlmError::Configuration(msg),
        }
    }
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queued = self.queue.lock().unwrap().len();
        let call_count = self.calls.lock().unwrap().len();
        f.debug_struct("MockProvider")
            .field("name", &self.name)
            .field("queued", &queued)
            .field("recorded_calls", &call_count)
            .finish_non_exhaustive()
    }
}

impl MockProvider {
    /// Creates a new mock named `name` with an empty queue.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Enqueues a successful response for the next `chat` call.
    pub fn queue_response(&self, response: ChatResponse) -> &Self {
        self.queue.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Enqueues an error for the next `chat` call.
    pub fn queue_error(&self, error: MockError) -> &Self {
        self.queue.lock().unwrap().push_back(Err(error));
        self
    }

    /// Returns `response` for every call once the queue is empty.
    pub fn always_respond(&self, response: ChatResponse) -> &Self {
        *self.fallback.lock().unwrap() = Some(Ok(response));
        self
    }

    /// Fails with `error` on every call once the queue is empty.
    pub fn always_fail(&self, error: MockError) -> &Self {
        *self.fallback.lock().unwrap() = Some(Err(error));
        self
    }

    /// Returns a clone of every request passed to `chat`, in call order.
    pub fn recorded_calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// How many times `chat` has been called.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_outcome(&self) -> Result<ChatResponse, MockError> {
        if let Some(outcome) = self.queue.lock().unwrap().pop_front() {
            return outcome;
        }
        self.fallback
            .lock()
            .unwrap()
            .clone()
            .expect("MockProvider: no queued responses remaining")
    }
}

impl Provider for MockProvider {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        self.calls.lock().unwrap().push(request.clone());
        self.next_outcome().map_err(MockError::into_llm_error)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
