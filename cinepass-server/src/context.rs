use std::sync::Arc;

use axum::extract::FromRef;
use cinepass_core::{Cinepass, PgDatabase};

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub cinepass: Arc<Cinepass<PgDatabase>>,
}
