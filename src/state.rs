use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    store::{AttemptRepository, QuizRepository, Store, UserRepository},
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub config: Config,
}

impl AppState {
    /// Wires every repository to the same backing store.
    pub fn new<S: Store + 'static>(store: Arc<S>, config: Config) -> Self {
        Self {
            users: store.clone(),
            quizzes: store.clone(),
            attempts: store,
            config,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
