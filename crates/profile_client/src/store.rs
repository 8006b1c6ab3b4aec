//! Shared user state: typed actions, a pure reducer, and the container that
//! views and sessions hold by `Arc`.

use shared::domain::UserRecord;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserState {
    pub current_user: Option<UserRecord>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    UpdateStart,
    UpdateSuccess(UserRecord),
    UpdateFailure(String),
    DeleteStart,
    DeleteSuccess,
    DeleteFailure(String),
}

impl UserAction {
    pub fn kind(&self) -> &'static str {
        match self {
            UserAction::UpdateStart => "update_user_start",
            UserAction::UpdateSuccess(_) => "update_user_success",
            UserAction::UpdateFailure(_) => "update_user_failure",
            UserAction::DeleteStart => "delete_user_start",
            UserAction::DeleteSuccess => "delete_user_success",
            UserAction::DeleteFailure(_) => "delete_user_failure",
        }
    }
}

pub fn reduce(state: &UserState, action: UserAction) -> UserState {
    let mut next = state.clone();
    match action {
        UserAction::UpdateStart | UserAction::DeleteStart => {
            next.loading = true;
        }
        UserAction::UpdateSuccess(user) => {
            next.current_user = Some(user);
            next.loading = false;
            next.error = None;
        }
        UserAction::DeleteSuccess => {
            next.current_user = None;
            next.loading = false;
            next.error = None;
        }
        UserAction::UpdateFailure(message) | UserAction::DeleteFailure(message) => {
            next.error = Some(message);
            next.loading = false;
        }
    }
    next
}

pub struct UserStore {
    state: RwLock<UserState>,
    changes: watch::Sender<UserState>,
}

impl UserStore {
    pub fn new(initial: UserState) -> Self {
        let (changes, _) = watch::channel(initial.clone());
        Self {
            state: RwLock::new(initial),
            changes,
        }
    }

    pub fn signed_in(user: UserRecord) -> Self {
        Self::new(UserState {
            current_user: Some(user),
            ..UserState::default()
        })
    }

    pub async fn dispatch(&self, action: UserAction) -> UserState {
        let mut guard = self.state.write().await;
        self.apply(&mut guard, action)
    }

    /// Dispatches a start action unless a request is already loading. The
    /// check and the dispatch happen under one write lock.
    pub async fn try_begin(&self, action: UserAction) -> Option<UserState> {
        let mut guard = self.state.write().await;
        if guard.loading {
            debug!(action = action.kind(), "user store: start refused, already loading");
            return None;
        }
        Some(self.apply(&mut guard, action))
    }

    // Publishes while the write lock is held so subscribers see states in
    // write order.
    fn apply(&self, state: &mut UserState, action: UserAction) -> UserState {
        let kind = action.kind();
        let next = reduce(state, action);
        *state = next.clone();
        info!(
            action = kind,
            loading = next.loading,
            has_error = next.error.is_some(),
            "user store: dispatched"
        );
        self.changes.send_replace(next.clone());
        next
    }

    pub async fn snapshot(&self) -> UserState {
        self.state.read().await.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UserState> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
