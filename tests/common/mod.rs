//! Shared fixtures: an in-process CRI image service served over tonic.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleet_image_syncer::cri::pb::image_service_server::{ImageService, ImageServiceServer};
use fleet_image_syncer::cri::pb::{
    Image, ImageSpec, ImageStatusRequest, ImageStatusResponse, PullImageRequest,
    PullImageResponse,
};
use fleet_image_syncer::cri::{self, CallTimeouts, ImageServiceGrpc, Target};
use tokio::net::TcpListener;
use tonic::{Request, Response, Status};

/// Call observed by the fake runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    ImageStatus(String),
    PullImage(String),
}

/// Image cache keyed by image reference. Successful pulls add to the cache.
#[derive(Default)]
pub struct FakeRuntime {
    cached: Mutex<HashSet<String>>,
    calls: Mutex<Vec<RuntimeCall>>,
    fail_status: Mutex<Option<Status>>,
    fail_pull: Mutex<Option<Status>>,
    pull_delay: Mutex<Option<Duration>>,
}

impl FakeRuntime {
    pub fn with_images(images: &[&str]) -> Arc<Self> {
        let runtime = Self::default();
        runtime
            .cached
            .lock()
            .unwrap()
            .extend(images.iter().map(|image| image.to_string()));
        Arc::new(runtime)
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_cached(&self, image: &str) -> bool {
        self.cached.lock().unwrap().contains(image)
    }

    pub fn fail_status_with(&self, status: Status) {
        *self.fail_status.lock().unwrap() = Some(status);
    }

    pub fn fail_pull_with(&self, status: Status) {
        *self.fail_pull.lock().unwrap() = Some(status);
    }

    pub fn delay_pulls(&self, delay: Duration) {
        *self.pull_delay.lock().unwrap() = Some(delay);
    }

    fn record(&self, call: RuntimeCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn requested_image(spec: Option<&ImageSpec>) -> String {
    spec.map(|spec| spec.image.clone()).unwrap_or_default()
}

/// Serves a shared handle so tests can inspect the runtime afterwards.
struct SharedRuntime(Arc<FakeRuntime>);

#[tonic::async_trait]
impl ImageService for SharedRuntime {
    async fn image_status(
        &self,
        request: Request<ImageStatusRequest>,
    ) -> Result<Response<ImageStatusResponse>, Status> {
        let image = requested_image(request.get_ref().image.as_ref());
        self.0.record(RuntimeCall::ImageStatus(image.clone()));

        let failure = self.0.fail_status.lock().unwrap().clone();
        if let Some(status) = failure {
            return Err(status);
        }

        let image = self.0.is_cached(&image).then(|| Image {
            id: format!("sha256:{:064x}", image.len()),
            repo_tags: vec![image.clone()],
            ..Default::default()
        });

        Ok(Response::new(ImageStatusResponse {
            image,
            ..Default::default()
        }))
    }

    async fn pull_image(
        &self,
        request: Request<PullImageRequest>,
    ) -> Result<Response<PullImageResponse>, Status> {
        let image = requested_image(request.get_ref().image.as_ref());
        self.0.record(RuntimeCall::PullImage(image.clone()));

        let delay = *self.0.pull_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.0.fail_pull.lock().unwrap().clone();
        if let Some(status) = failure {
            return Err(status);
        }

        self.0.cached.lock().unwrap().insert(image.clone());
        Ok(Response::new(PullImageResponse {
            image_ref: format!("{}@sha256:pulled", image),
        }))
    }
}

/// Start the fake runtime on an ephemeral port.
pub async fn spawn_runtime(runtime: Arc<FakeRuntime>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);

    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(ImageServiceServer::new(SharedRuntime(runtime)))
            .serve_with_incoming(incoming)
            .await
            .unwrap();
    });

    addr
}

/// Client connected through the same path the binary uses.
pub async fn connect_client(addr: SocketAddr, timeouts: CallTimeouts) -> ImageServiceGrpc {
    let target = Target::parse(&addr.to_string()).unwrap();
    let channel = cri::transport::connect(&target, Duration::from_secs(5))
        .await
        .unwrap();
    ImageServiceGrpc::new(channel, timeouts)
}
