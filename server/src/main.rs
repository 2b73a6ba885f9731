#![deny(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::complexity)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::perf)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![doc = include_str!("../../README.md")]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Query;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use clap::Parser;
use log::info;
use pts_mesh::Config;
use pts_mesh::Orchestrator;
use pts_mesh::pipeline::ApiResponse;
use pts_mesh::reconstruct::AlphaParams;
use pts_mesh::reconstruct::PoissonParams;
use pts_mesh::reconstruct::ThresholdParams;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;


#[derive(Parser, Debug)]
#[command(version, about, long_about)]
struct Cli {
    #[arg(long = "bind", default_value = "127.0.0.1:8000")]
    bind: SocketAddr,
    #[arg(long = "source", help = "point cloud described by GET /point-cloud without a filepath")]
    sources: Vec<PathBuf>,
    #[arg(long = "alpha", default_value_t = AlphaParams::default().alpha)]
    alpha: f64,
    #[arg(long = "radius", default_value_t = PoissonParams::default().radius)]
    radius: f64,
    #[arg(long = "max-nn", default_value_t = PoissonParams::default().max_nn)]
    max_nn: usize,
    #[arg(long = "depth", default_value_t = PoissonParams::default().depth)]
    depth: u32,
    #[arg(long = "threshold", default_value_t = ThresholdParams::default().threshold)]
    threshold: f64,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            sources: self.sources.clone(),
            alpha: AlphaParams { alpha: self.alpha },
            poisson: PoissonParams {
                radius: self.radius,
                max_nn: self.max_nn,
                depth: self.depth,
            },
            threshold: ThresholdParams {
                threshold: self.threshold,
                alpha: self.alpha,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateMesh {
    filepath: PathBuf,
    algorithm: String,
}

#[derive(Debug, Deserialize)]
struct FileQuery {
    filepath: Option<PathBuf>,
}

type AppState = Arc<Orchestrator>;

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": format!("Exception: {message}") })),
    )
        .into_response()
}

// Reconstruction is CPU bound; keep it off the async workers.
async fn blocking(job: impl FnOnce() -> ApiResponse + Send + 'static) -> Response {
    match tokio::task::spawn_blocking(job).await {
        Ok(response) => {
            let status =
                StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(response.body)).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": format!("Exception: {e}") })),
        )
            .into_response(),
    }
}

async fn create_mesh(
    State(orchestrator): State<AppState>,
    body: Result<Json<CreateMesh>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };
    info!("POST /point-cloud {} ({})", request.filepath.display(), request.algorithm);
    blocking(move || orchestrator.create_mesh_response(&request.filepath, &request.algorithm)).await
}

async fn point_cloud_info(
    State(orchestrator): State<AppState>,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };
    blocking(move || orchestrator.point_cloud_info_response(query.filepath.as_deref())).await
}

async fn mesh_info(
    State(orchestrator): State<AppState>,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };
    let Some(path) = query.filepath else {
        return bad_request("missing query parameter 'filepath'");
    };
    blocking(move || orchestrator.mesh_info_response(&path)).await
}

fn routes(orchestrator: Orchestrator) -> Router {
    Router::new()
        .route("/point-cloud", get(point_cloud_info).post(create_mesh))
        .route("/3d-mesh", get(mesh_info))
        .with_state(Arc::new(orchestrator))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let app = routes(Orchestrator::new(cli.config()));

    let listener = TcpListener::bind(cli.bind).await?;
    info!("listening on http://{}", cli.bind);
    axum::serve(listener, app).await
}
