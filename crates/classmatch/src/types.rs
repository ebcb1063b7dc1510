use crate::config::Config;
use crate::db::MatcherDb;

/// Shared state handed to every request handler.
pub struct AppState {
    pub db: MatcherDb,
    pub config: Config,
}

impl AppState {
    pub fn new(db: MatcherDb, config: Config) -> Self {
        Self { db, config }
    }
}
