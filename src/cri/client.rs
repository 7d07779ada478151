//! ImageService trait and tonic client

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::Channel;
use tonic::Status;

use super::pb::image_service_client::ImageServiceClient;
use super::pb::{
    ImageSpec, ImageStatusRequest, ImageStatusResponse, PullImageRequest, PullImageResponse,
};

/// The two ImageService calls the syncer needs.
///
/// No logic beyond request/response marshaling lives behind this trait.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Query whether an image is cached. `image` is `None` in the response when it is not.
    async fn image_status(
        &self,
        request: ImageStatusRequest,
    ) -> Result<ImageStatusResponse, Status>;

    /// Pull an image into the runtime cache.
    async fn pull_image(&self, request: PullImageRequest) -> Result<PullImageResponse, Status>;
}

#[async_trait]
impl<T: ImageService + ?Sized> ImageService for Arc<T> {
    async fn image_status(
        &self,
        request: ImageStatusRequest,
    ) -> Result<ImageStatusResponse, Status> {
        (**self).image_status(request).await
    }

    async fn pull_image(&self, request: PullImageRequest) -> Result<PullImageResponse, Status> {
        (**self).pull_image(request).await
    }
}

/// Deadlines applied to each remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTimeouts {
    pub status: Duration,
    pub pull: Duration,
}

impl Default for CallTimeouts {
    fn default() -> Self {
        Self {
            status: Duration::from_secs(10),
            pull: Duration::from_secs(300),
        }
    }
}

/// tonic-backed [`ImageService`] sharing one channel across all calls.
#[derive(Debug, Clone)]
pub struct ImageServiceGrpc {
    client: ImageServiceClient<Channel>,
    timeouts: CallTimeouts,
}

impl ImageServiceGrpc {
    pub fn new(channel: Channel, timeouts: CallTimeouts) -> Self {
        Self {
            client: ImageServiceClient::new(channel),
            timeouts,
        }
    }

    pub fn timeouts(&self) -> CallTimeouts {
        self.timeouts
    }
}

#[async_trait]
impl ImageService for ImageServiceGrpc {
    async fn image_status(
        &self,
        request: ImageStatusRequest,
    ) -> Result<ImageStatusResponse, Status> {
        let mut client = self.client.clone();
        let mut request = tonic::Request::new(request);
        request.set_timeout(self.timeouts.status);

        let response = with_deadline(self.timeouts.status, client.image_status(request)).await?;
        Ok(response.into_inner())
    }

    async fn pull_image(&self, request: PullImageRequest) -> Result<PullImageResponse, Status> {
        let mut client = self.client.clone();
        let mut request = tonic::Request::new(request);
        request.set_timeout(self.timeouts.pull);

        let response = with_deadline(self.timeouts.pull, client.pull_image(request)).await?;
        Ok(response.into_inner())
    }
}

/// Bound `call` locally as well, in case the runtime ignores `grpc-timeout`.
async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, Status>
where
    F: Future<Output = Result<T, Status>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(Status::deadline_exceeded(format!(
            "no response from image service within {:?}",
            deadline
        ))),
    }
}

fn image_spec(image: &str) -> ImageSpec {
    ImageSpec {
        image: image.to_owned(),
        ..Default::default()
    }
}

pub fn image_status_request(image: &str) -> ImageStatusRequest {
    ImageStatusRequest {
        image: Some(image_spec(image)),
        verbose: false,
    }
}

pub fn pull_image_request(image: &str) -> PullImageRequest {
    PullImageRequest {
        image: Some(image_spec(image)),
        auth: None,
    }
}
