//! # Mock Store & Testing Guide
//!
//! `MockClient<T>` hands out a real [`ResourceClient<T>`] whose requests are
//! answered from a queue of expectations instead of a store actor. Code built
//! on a client (the [`ResourceHandler`](crate::ResourceHandler), cascade rules,
//! a kind's lifecycle hooks) can then be tested without spawning stores, and
//! with failures that are hard to produce for real.
//!
//! ## When to use Mocks vs Real Stores
//!
//! | Feature | MockClient | Real Store |
//! |---------|------------|------------|
//! | **Speed** | Instant (in-memory) | Fast (but involves tokio spawn) |
//! | **Determinism** | 100% Deterministic | Subject to scheduler |
//! | **State** | No real state (expectations) | Real records, ids, uniqueness |
//! | **Use Case** | Logic *around* the client | The store itself or the full system |
//! | **Error Injection** | Easy (`return_err`) | Hard (requires specific state) |
//!
//! ## Example
//!
//! ```rust
//! use resource_framework::mock::MockClient;
//! use resource_framework::{FrameworkError, RecordId, Resource, Schema};
//! use serde::{Deserialize, Serialize};
//! use std::sync::OnceLock;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Department { id: RecordId, name: String }
//!
//! impl Resource for Department {
//!     const KIND: &'static str = "departments";
//!     type Context = ();
//!     fn schema() -> &'static Schema {
//!         static SCHEMA: OnceLock<Schema> = OnceLock::new();
//!         SCHEMA.get_or_init(|| Schema::new("departments"))
//!     }
//!     fn id(&self) -> RecordId { self.id }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mock = MockClient::<Department>::new();
//!     mock.expect_get(RecordId(1)).return_err(FrameworkError::ActorClosed);
//!
//!     let result = mock.client().get(RecordId(1)).await;
//!     assert!(matches!(result, Err(FrameworkError::ActorClosed)));
//!     mock.verify();
//! }
//! ```
//!
//! A request that does not match the next expectation gets no answer (the
//! caller sees `ActorDropped`) and makes [`MockClient::verify`] fail.

use crate::client::ResourceClient;
use crate::entity::Resource;
use crate::error::FrameworkError;
use crate::message::{ResourceRequest, Response};
use crate::record::RecordId;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

enum Expectation<T: Resource> {
    Create {
        response: Result<T, FrameworkError>,
    },
    Get {
        id: RecordId,
        response: Result<T, FrameworkError>,
    },
    List {
        response: Result<Vec<T>, FrameworkError>,
    },
    Update {
        id: RecordId,
        response: Result<T, FrameworkError>,
    },
    Delete {
        id: RecordId,
        response: Result<T, FrameworkError>,
    },
}

struct Ledger<T: Resource> {
    expected: VecDeque<Expectation<T>>,
    unexpected: Vec<String>,
}

type Shared<T> = Arc<Mutex<Ledger<T>>>;

fn lock<T: Resource>(shared: &Shared<T>) -> MutexGuard<'_, Ledger<T>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn answer<R>(respond_to: Response<R>, response: Result<R, FrameworkError>) {
    let _ = respond_to.send(response);
}

/// A mock store with expectation tracking.
pub struct MockClient<T: Resource> {
    client: ResourceClient<T>,
    ledger: Shared<T>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: Resource> Default for MockClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> MockClient<T> {
    /// Creates a mock with no expectations. Must be called inside a runtime.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<ResourceRequest<T>>(100);
        let ledger: Shared<T> = Arc::new(Mutex::new(Ledger {
            expected: VecDeque::new(),
            unexpected: Vec::new(),
        }));
        let shared = ledger.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = lock(&shared).expected.pop_front();

                match (request, expectation) {
                    (ResourceRequest::Create { respond_to, .. }, Some(Expectation::Create { response })) => {
                        answer(respond_to, response)
                    }
                    (ResourceRequest::Get { id, respond_to }, Some(Expectation::Get { id: want, response }))
                        if id == want =>
                    {
                        answer(respond_to, response)
                    }
                    (ResourceRequest::List { respond_to, .. }, Some(Expectation::List { response })) => {
                        answer(respond_to, response)
                    }
                    (
                        ResourceRequest::Update { id, respond_to, .. },
                        Some(Expectation::Update { id: want, response }),
                    ) if id == want => answer(respond_to, response),
                    (
                        ResourceRequest::Delete { id, respond_to },
                        Some(Expectation::Delete { id: want, response }),
                    ) if id == want => answer(respond_to, response),
                    (request, _) => {
                        lock(&shared).unexpected.push(format!("{:?}", request));
                    }
                }
            }
        });

        Self {
            client: ResourceClient::new(sender),
            ledger,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> ResourceClient<T> {
        self.client.clone()
    }

    pub fn expect_create(&mut self) -> ExpectationBuilder<T, T> {
        self.builder(|response| Expectation::Create { response })
    }

    pub fn expect_get(&mut self, id: RecordId) -> ExpectationBuilder<T, T> {
        self.builder(move |response| Expectation::Get { id, response })
    }

    pub fn expect_list(&mut self) -> ExpectationBuilder<T, Vec<T>> {
        self.builder(|response| Expectation::List { response })
    }

    pub fn expect_update(&mut self, id: RecordId) -> ExpectationBuilder<T, T> {
        self.builder(move |response| Expectation::Update { id, response })
    }

    pub fn expect_delete(&mut self, id: RecordId) -> ExpectationBuilder<T, T> {
        self.builder(move |response| Expectation::Delete { id, response })
    }

    fn builder<R>(
        &self,
        make: impl FnOnce(Result<R, FrameworkError>) -> Expectation<T> + Send + 'static,
    ) -> ExpectationBuilder<T, R> {
        ExpectationBuilder {
            ledger: self.ledger.clone(),
            make: Box::new(make),
        }
    }

    /// Panics unless every expectation was consumed and nothing unexpected arrived.
    pub fn verify(&self) {
        let ledger = lock(&self.ledger);
        if !ledger.unexpected.is_empty() {
            panic!("Unexpected requests: {:?}", ledger.unexpected);
        }
        if !ledger.expected.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining",
                ledger.expected.len()
            );
        }
    }
}

type MakeExpectation<T, R> = Box<dyn FnOnce(Result<R, FrameworkError>) -> Expectation<T> + Send>;

/// Queues the response for one expected request.
pub struct ExpectationBuilder<T: Resource, R> {
    ledger: Shared<T>,
    make: MakeExpectation<T, R>,
}

impl<T: Resource, R> ExpectationBuilder<T, R> {
    pub fn return_ok(self, value: R) {
        lock(&self.ledger).expected.push_back((self.make)(Ok(value)));
    }

    pub fn return_err(self, error: FrameworkError) {
        lock(&self.ledger).expected.push_back((self.make)(Err(error)));
    }
}

/// Creates a client and the receiving end of its channel, for tests that
/// inspect the raw requests themselves.
pub fn create_mock_client<T: Resource>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}
