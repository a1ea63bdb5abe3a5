use crate::backend::resolver::{ComResolver, MonikerResolver};
use crate::com_guard::Apartment;
use crate::com_worker::{MonikerRequest, MonikerWorker};
use crate::errors::MonikerResult;
use crate::provider::{Comparison, MonikerInfo, MonikerProvider};
use async_trait::async_trait;
use std::sync::Arc;

/// Concrete [`MonikerProvider`] backed by a dedicated COM thread.
pub struct MonikerClient<R: MonikerResolver + 'static = ComResolver> {
    pub worker: MonikerWorker<R>,
}

impl<R: MonikerResolver + 'static> MonikerClient<R> {
    /// Starts the worker in the multithreaded apartment.
    ///
    /// Blocks until COM is initialized on the worker.
    pub fn new(resolver: R) -> MonikerResult<Self> {
        Self::with_apartment(resolver, Apartment::default())
    }

    pub fn with_apartment(resolver: R, apartment: Apartment) -> MonikerResult<Self> {
        tracing::info!(?apartment, "Initializing MonikerClient...");
        let worker = MonikerWorker::start(Arc::new(resolver), apartment)?;
        tracing::info!("MonikerClient initialized successfully");
        Ok(Self { worker })
    }
}

#[async_trait]
impl<R: MonikerResolver + 'static> MonikerProvider for MonikerClient<R> {
    async fn describe(&self, display_name: &str) -> MonikerResult<MonikerInfo> {
        let display_name = display_name.to_string();
        self.worker
            .send_request(|reply| MonikerRequest::Describe {
                display_name,
                reply,
            })
            .await
    }

    async fn compare(&self, left: &str, right: &str) -> MonikerResult<Comparison> {
        let left = left.to_string();
        let right = right.to_string();
        self.worker
            .send_request(|reply| MonikerRequest::Compare { left, right, reply })
            .await
    }

    async fn list_running(&self) -> MonikerResult<Vec<String>> {
        self.worker
            .send_request(|reply| MonikerRequest::ListRunning { reply })
            .await
    }
}
