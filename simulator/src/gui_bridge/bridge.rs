use crate::gui_bridge::model::VisualizationModel;
use crate::workflow::runner::{DetectionRun, Runner};
use anyhow::{Context, Result};
use chrono::Utc;
use ecobotcore::detection::{DetectionExport, ImageUpload, UploadError};
use ecobotcore::prelude::DetectError;
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, PoisonError, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::{
    http::StatusCode,
    hyper::body::Bytes,
    reply::{self, Response},
    Filter, Reply,
};

/// Model plus the raw bytes of the image it describes.
#[derive(Debug, Default)]
struct BridgeState {
    model: VisualizationModel,
    image: Option<(Vec<u8>, String)>,
}

type SharedState = Arc<RwLock<BridgeState>>;

#[derive(Debug, Deserialize)]
struct DetectQuery {
    name: Option<String>,
}

/// Pins an image request to the model revision the client is showing.
#[derive(Debug, Deserialize)]
struct ImageQuery {
    revision: Option<u64>,
}

/// Bridge that hosts the detection HTTP endpoint and holds the latest result.
pub struct GuiBridge {
    state: SharedState,
    runner: Arc<Runner>,
}

impl GuiBridge {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self {
            state: Arc::new(RwLock::new(BridgeState::default())),
            runner,
        }
    }

    /// Serves the routes on a dedicated thread with its own runtime.
    pub fn spawn(&self, addr: SocketAddr) -> Result<thread::JoinHandle<()>> {
        let routes = routes(self.state.clone(), self.runner.clone());
        thread::Builder::new()
            .name("ecobot-bridge".into())
            .spawn(move || {
                let runtime = match Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        error!("failed to build bridge runtime: {}", err);
                        return;
                    }
                };
                runtime.block_on(async move {
                    info!("bridge listening on http://{}", addr);
                    warp::serve(routes).run(addr).await;
                });
            })
            .context("spawning bridge thread")
    }

    /// Replaces the served model with an offline run.
    pub fn publish(&self, run: &DetectionRun, image: Vec<u8>, content_type: String) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let revision = guard.model.revision + 1;
        guard.model = VisualizationModel::from_run(revision, run);
        guard.image = Some((image, content_type));
        info!(
            "[GUI] revision {}: {} detections on {}",
            revision,
            run.results.len(),
            run.image_name
        );
    }

    pub fn publish_status(&self, message: &str) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .model
            .status = message.to_string();
        info!("[GUI] {}", message);
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> VisualizationModel {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .model
            .clone()
    }
}

fn with_state(
    state: SharedState,
) -> impl Filter<Extract = (SharedState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn with_runner(
    runner: Arc<Runner>,
) -> impl Filter<Extract = (Arc<Runner>,), Error = Infallible> + Clone {
    warp::any().map(move || runner.clone())
}

fn routes(
    state: SharedState,
    runner: Arc<Runner>,
) -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone {
    let payload_route = warp::path("payload")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(|state: SharedState| {
            let guard = state.read().unwrap_or_else(PoisonError::into_inner);
            reply::json(&guard.model).into_response()
        });

    let upload_limit = runner.max_upload_bytes();
    let detect_route = warp::path("detect")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::query::<DetectQuery>())
        .and(warp::header::optional::<String>("content-type"))
        .and(warp::body::content_length_limit(upload_limit))
        .and(warp::body::bytes())
        .and(with_state(state.clone()))
        .and(with_runner(runner.clone()))
        .and_then(handle_detect);

    let image_route = warp::path("image")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<ImageQuery>())
        .and(with_state(state.clone()))
        .map(|query: ImageQuery, state: SharedState| {
            let guard = state.read().unwrap_or_else(PoisonError::into_inner);
            if query
                .revision
                .is_some_and(|revision| revision != guard.model.revision)
            {
                return StatusCode::CONFLICT.into_response();
            }
            match guard.image.as_ref() {
                Some((bytes, content_type)) => {
                    reply::with_header(bytes.clone(), "content-type", content_type.clone())
                        .into_response()
                }
                None => StatusCode::NOT_FOUND.into_response(),
            }
        });

    let export_route = warp::path("export")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(|state: SharedState| {
            let guard = state.read().unwrap_or_else(PoisonError::into_inner);
            let export = DetectionExport::new(&guard.model.detections, Utc::now());
            reply::json(&export).into_response()
        });

    let reset_route = warp::path("reset")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state))
        .map(|state: SharedState| {
            let mut guard = state.write().unwrap_or_else(PoisonError::into_inner);
            let revision = guard.model.revision + 1;
            *guard = BridgeState {
                model: VisualizationModel::cleared(revision),
                image: None,
            };
            reply::json(&json!({ "status": "ok", "revision": revision })).into_response()
        });

    let metrics_route = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_runner(runner))
        .map(|runner: Arc<Runner>| reply::json(&runner.metrics()).into_response());

    payload_route
        .or(detect_route)
        .unify()
        .or(image_route)
        .unify()
        .or(export_route)
        .unify()
        .or(reset_route)
        .unify()
        .or(metrics_route)
        .unify()
        .recover(move |rejection: warp::Rejection| handle_rejection(rejection, upload_limit))
        .unify()
}

/// Oversized uploads are refused before their body is buffered.
async fn handle_rejection(
    rejection: warp::Rejection,
    limit: u64,
) -> Result<Response, warp::Rejection> {
    if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        warn!("detect error: upload over {} bytes refused", limit);
        let message = UploadError::TooLarge { size: 0, limit }.to_string();
        return Ok(reply::with_status(
            reply::json(&json!({ "status": "error", "message": message })),
            StatusCode::PAYLOAD_TOO_LARGE,
        )
        .into_response());
    }
    Err(rejection)
}

async fn handle_detect(
    query: DetectQuery,
    content_type: Option<String>,
    body: Bytes,
    state: SharedState,
    runner: Arc<Runner>,
) -> Result<Response, Infallible> {
    let name = query.name.unwrap_or_else(|| "upload".into());
    let upload = ImageUpload::new(name, content_type.clone(), body.to_vec());

    match runner.execute(&upload).await {
        Ok(run) => {
            let mut guard = state.write().unwrap_or_else(PoisonError::into_inner);
            let revision = guard.model.revision + 1;
            guard.model = VisualizationModel::from_run(revision, &run);
            guard.image = Some((
                upload.bytes,
                content_type.unwrap_or_else(|| "application/octet-stream".into()),
            ));
            info!(
                "[GUI] {} -> {} detections (revision {})",
                run.image_name,
                run.results.len(),
                revision
            );
            Ok(reply::json(&json!({
                "status": "ok",
                "revision": revision,
                "detections": run.results,
                "description": format!("Found {} plastic items", run.results.len()),
            }))
            .into_response())
        }
        Err(err) => {
            let status = match err {
                DetectError::Upload(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let message = err.user_message();
            warn!("detect error: {}", err);
            state.write().unwrap_or_else(PoisonError::into_inner).model.status = message.clone();
            Ok(reply::with_status(
                reply::json(&json!({ "status": "error", "message": message })),
                status,
            )
            .into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::config::SimulatorConfig;
    use crate::workflow::runner::tests::{instant_config, png_bytes};
    use ecobotcore::detection::MockDetector;

    fn bridge() -> GuiBridge {
        GuiBridge::new(Arc::new(Runner::new(instant_config()).unwrap()))
    }

    #[test]
    fn gui_bridge_publish_updates_state() {
        let gui = bridge();
        let run = DetectionRun {
            image_name: "beach.png".into(),
            natural_size: (500, 400),
            results: MockDetector::default_results(),
        };
        gui.publish(&run, png_bytes(500, 400), "image/png".into());
        let snapshot = gui.snapshot();
        assert_eq!(snapshot.revision, 1);
        assert_eq!(snapshot.summary.total_items, 4);
        assert_eq!(snapshot.image_width, 500);

        gui.publish_status("Offline workflow results ready.");
        assert_eq!(gui.snapshot().status, "Offline workflow results ready.");
    }

    #[tokio::test]
    async fn detect_route_stores_results_and_image() {
        let gui = bridge();
        let filter = routes(gui.state.clone(), gui.runner.clone());

        let response = warp::test::request()
            .method("POST")
            .path("/detect?name=beach.png")
            .header("content-type", "image/png")
            .body(png_bytes(500, 400))
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["detections"].as_array().unwrap().len(), 4);
        assert_eq!(body["description"], "Found 4 plastic items");

        let payload = warp::test::request().path("/payload").reply(&filter).await;
        let model: VisualizationModel = serde_json::from_slice(payload.body()).unwrap();
        assert_eq!(model.image_name.as_deref(), Some("beach.png"));
        assert_eq!((model.image_width, model.image_height), (500, 400));

        let image = warp::test::request().path("/image").reply(&filter).await;
        assert_eq!(image.status(), StatusCode::OK);
        assert_eq!(image.headers()["content-type"], "image/png");
    }

    #[tokio::test]
    async fn image_route_refuses_a_mismatched_revision() {
        let gui = bridge();
        let run = DetectionRun {
            image_name: "beach.png".into(),
            natural_size: (500, 400),
            results: MockDetector::default_results(),
        };
        gui.publish(&run, png_bytes(500, 400), "image/png".into());
        gui.publish(&run, png_bytes(60, 40), "image/png".into());
        let filter = routes(gui.state.clone(), gui.runner.clone());

        let stale = warp::test::request()
            .path("/image?revision=1")
            .reply(&filter)
            .await;
        assert_eq!(stale.status(), StatusCode::CONFLICT);

        let current = warp::test::request()
            .path("/image?revision=2")
            .reply(&filter)
            .await;
        assert_eq!(current.status(), StatusCode::OK);
        assert_eq!(current.body().as_ref(), png_bytes(60, 40).as_slice());
    }

    #[tokio::test]
    async fn oversized_upload_is_refused_before_detection() {
        let config = SimulatorConfig {
            max_upload_bytes: 1024 * 1024,
            ..instant_config()
        };
        let gui = GuiBridge::new(Arc::new(Runner::new(config).unwrap()));
        let filter = routes(gui.state.clone(), gui.runner.clone());

        let response = warp::test::request()
            .method("POST")
            .path("/detect?name=huge.png")
            .header("content-type", "image/png")
            .body(vec![0u8; 1024 * 1024 + 1])
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["message"], "File size exceeds 1MB limit");
        assert_eq!(gui.runner.metrics().detection_runs, 0);
        assert_eq!(gui.snapshot().revision, 0);
    }

    #[tokio::test]
    async fn detect_route_rejects_non_images() {
        let gui = bridge();
        let filter = routes(gui.state.clone(), gui.runner.clone());

        let response = warp::test::request()
            .method("POST")
            .path("/detect")
            .header("content-type", "text/plain")
            .body("hello")
            .reply(&filter)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["message"], "Please upload an image file (JPEG, PNG, etc.)");
        assert_eq!(gui.snapshot().revision, 0);
    }

    #[tokio::test]
    async fn export_and_reset_routes() {
        let gui = bridge();
        let run = DetectionRun {
            image_name: "beach.png".into(),
            natural_size: (500, 400),
            results: MockDetector::default_results(),
        };
        gui.publish(&run, png_bytes(500, 400), "image/png".into());
        let filter = routes(gui.state.clone(), gui.runner.clone());

        let export = warp::test::request().path("/export").reply(&filter).await;
        let export: DetectionExport = serde_json::from_slice(export.body()).unwrap();
        assert_eq!(export.summary.type_breakdown["fishing_net"], 1);

        let reset = warp::test::request()
            .method("POST")
            .path("/reset")
            .reply(&filter)
            .await;
        assert_eq!(reset.status(), StatusCode::OK);
        assert!(gui.snapshot().detections.is_empty());
        assert_eq!(gui.snapshot().revision, 2);

        let image = warp::test::request().path("/image").reply(&filter).await;
        assert_eq!(image.status(), StatusCode::NOT_FOUND);
    }
}
