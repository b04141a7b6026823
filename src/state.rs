use crate::config::Config;
use crate::services::standings::StandingsService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub standings: StandingsService,
    pub config: Config,
}

pub type SharedState = Arc<AppState>;
