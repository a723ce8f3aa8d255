//! # Store Client
//!
//! This module defines the generic client for communicating with store actors.

use crate::entity::Resource;
use crate::error::FrameworkError;
use crate::filter::ListQuery;
use crate::message::{ResourceRequest, WriteMode};
use crate::permission::CallerId;
use crate::record::{Fields, RecordId};
use crate::validate::ValidationErrors;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

/// A type-safe client for interacting with a `ResourceActor`.
///
/// The client holds only the sending half of the actor's channel, so cloning
/// it is cheap and clones can be shared freely across tasks. Every method
/// sends one request and awaits the actor's reply on a oneshot channel.
pub struct ResourceClient<T: Resource> {
    sender: mpsc::Sender<ResourceRequest<T>>,
}

impl<T: Resource> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: Resource> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<R, FrameworkError>>) -> ResourceRequest<T>,
    ) -> Result<R, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn create(
        &self,
        fields: Fields,
        owner: Option<CallerId>,
    ) -> Result<T, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Create {
            fields,
            owner,
            respond_to,
        })
        .await
    }

    pub async fn get(&self, id: RecordId) -> Result<T, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Get { id, respond_to })
            .await
    }

    pub async fn list(&self, query: ListQuery) -> Result<Vec<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::List { query, respond_to })
            .await
    }

    pub async fn update(
        &self,
        id: RecordId,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<T, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Update {
            id,
            fields,
            mode,
            respond_to,
        })
        .await
    }

    pub async fn delete(&self, id: RecordId) -> Result<T, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Delete { id, respond_to })
            .await
    }

    #[instrument(skip(self), fields(entity_type = T::KIND))]
    pub async fn delete_where(
        &self,
        field: &'static str,
        target: RecordId,
    ) -> Result<Vec<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::DeleteWhere {
            field,
            target,
            respond_to,
        })
        .await
    }

    /// Checks that the record a reference `field` points at exists.
    ///
    /// A missing target is reported as a validation error on `field`; channel
    /// failures pass through unchanged.
    #[instrument(skip(self), fields(entity_type = T::KIND))]
    pub async fn ensure_exists(
        &self,
        field: &str,
        id: RecordId,
    ) -> Result<(), FrameworkError> {
        match self.get(id).await {
            Ok(_) => Ok(()),
            Err(FrameworkError::NotFound { .. }) => {
                debug!(field, %id, "Reference to missing record");
                Err(FrameworkError::Invalid(ValidationErrors::single(
                    field,
                    format!("Invalid pk \"{}\" - object does not exist.", id),
                )))
            }
            Err(e) => Err(e),
        }
    }
}
