use std::{net::SocketAddr, sync::Arc};

use backend::{AppState, create_router, store::CrimeStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = match std::env::var("DATASET_JSON") {
        Ok(path) => {
            let store = CrimeStore::from_file(&path).expect("load crime dataset");
            tracing::info!("loaded crime dataset from {path}");
            store
        }
        Err(_) => CrimeStore::sample().expect("bundled sample dataset"),
    };
    tracing::info!(
        cities = store.cities().len(),
        incidents = store.incidents().len(),
        "crime store ready"
    );

    let state = AppState {
        store: Arc::new(store),
    };
    let app = create_router(state);

    let addr: SocketAddr = "0.0.0.0:8080".parse().expect("valid socket address");
    tracing::info!("starting backend on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await.unwrap(), app)
        .await
        .unwrap();
}
