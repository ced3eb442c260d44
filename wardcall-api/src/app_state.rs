use std::sync::Arc;

use crate::domain::NotificationDispatcher;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<NotificationDispatcher>,
}

impl AppState {
    pub fn new(dispatcher: NotificationDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}
