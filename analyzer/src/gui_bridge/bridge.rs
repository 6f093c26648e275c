use crate::gui_bridge::model::VisualizationModel;
use crate::workflow::config::WorkflowConfig;
use crate::workflow::runner::Runner;
use frtmcore::plot::PlotSequence;
use frtmcore::RadarCapture;
use log::{error, info};
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

fn gui_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

type SharedModel = Arc<RwLock<VisualizationModel>>;

/// Holds the latest plot sequence and serves it over HTTP.
pub struct GuiBridge {
    state: SharedModel,
    runner: Arc<Runner>,
    capture: Arc<RadarCapture>,
}

impl GuiBridge {
    pub fn new(runner: Arc<Runner>, capture: Arc<RadarCapture>) -> Self {
        Self {
            state: Arc::new(RwLock::new(VisualizationModel::default())),
            runner,
            capture,
        }
    }

    /// Starts `GET /frames` and `POST /process` on a background thread.
    pub fn serve(&self) {
        let state_for_filter = self.state.clone();
        let state_filter = warp::any().map(move || state_for_filter.clone());
        let runner = self.runner.clone();
        let runner_filter = warp::any().map(move || runner.clone());
        let capture = self.capture.clone();
        let capture_filter = warp::any().map(move || capture.clone());

        let get_route = warp::path("frames")
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: SharedModel| warp::reply::json(&read_sequence(&state)));

        let post_route = warp::path("process")
            .and(warp::post())
            .and(warp::body::json())
            .and(state_filter)
            .and(runner_filter)
            .and(capture_filter)
            .map(
                |config: WorkflowConfig,
                 state: SharedModel,
                 runner: Arc<Runner>,
                 capture: Arc<RadarCapture>| {
                    let transform = config.transform;
                    let runner = runner.with_config(config);
                    let mut capture = (*capture).clone();
                    match runner
                        .prepare(&mut capture)
                        .and_then(|_| runner.execute(&capture))
                    {
                        Ok(result) => {
                            let frames = result.sequence.len();
                            let source = read_model(&state).source;
                            store(
                                &state,
                                VisualizationModel::from_result(source, transform, &result),
                            );
                            warp::reply::with_status(
                                warp::reply::json(&json!({"status": "ok", "frames": frames})),
                                StatusCode::OK,
                            )
                        }
                        Err(err) => {
                            error!("process request failed: {err:#}");
                            warp::reply::with_status(
                                warp::reply::json(&json!({
                                    "status": "error",
                                    "message": format!("{err:#}")
                                })),
                                StatusCode::BAD_REQUEST,
                            )
                        }
                    }
                },
            );

        thread::spawn(move || {
            let routes = get_route.or(post_route);
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("failed to build bridge runtime: {err}");
                    return;
                }
            };
            runtime.block_on(async move {
                warp::serve(routes).run(gui_bind_address()).await;
            });
        });
        info!("HTTP bridge listening on http://{}", gui_bind_address());
    }

    pub fn publish(&self, model: VisualizationModel) {
        info!(
            "[GUI] {} frame(s) of {:?} published",
            model.sequence.len(),
            model.transform
        );
        store(&self.state, model);
    }

    pub fn publish_status(&self, message: &str) {
        println!("[GUI] {}", message);
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> VisualizationModel {
        read_model(&self.state)
    }
}

fn read_model(state: &SharedModel) -> VisualizationModel {
    match state.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn read_sequence(state: &SharedModel) -> PlotSequence {
    read_model(state).sequence
}

fn store(state: &SharedModel, model: VisualizationModel) {
    match state.write() {
        Ok(mut guard) => *guard = model,
        Err(poisoned) => *poisoned.into_inner() = model,
    }
}
