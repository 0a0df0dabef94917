use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::routing::get;
use cinepass_core::{Cinepass, PgDatabase};
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub mod auth;
pub mod bookings;
pub mod context;
pub mod docs;
pub mod errors;
pub mod logging;
pub mod movies;
pub mod schemas;
pub mod serialized;

pub use context::ServerContext;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9060;

pub type Router = axum::Router<ServerContext>;

/// Starts the cinepass server
pub async fn run_server() {
    let port = env::var("CINEPASS_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let database_url =
        env::var("CINEPASS_DATABASE_URL").expect("CINEPASS_DATABASE_URL must be set");

    let database = PgDatabase::new(&database_url)
        .await
        .expect("database is reachable");

    let context = ServerContext {
        cinepass: Arc::new(Cinepass::new(database)),
    };

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let root_router = Router::new()
        .merge(auth::router())
        .merge(bookings::router())
        .merge(movies::router())
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("Listening on {}", addr);

    axum::serve(listener, root_router.into_make_service())
        .await
        .expect("server runs");
}
