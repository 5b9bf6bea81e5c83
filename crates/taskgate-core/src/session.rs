use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

use crate::storage::{Storage, USERNAME_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Entry,
    Dashboard,
    Tasks,
    About,
}

impl Route {
    pub fn is_protected(self) -> bool {
        !matches!(self, Route::Entry)
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Entry => "/",
            Route::Dashboard => "/dashboard",
            Route::Tasks => "/tasks",
            Route::About => "/about",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Please enter a username")]
    EmptyName,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Decides access to protected routes from the stored identity alone.
///
/// An identity that is blank after trimming counts as absent, so a hand-edited
/// empty `username` entry does not unlock anything.
#[derive(Debug)]
pub struct SessionGate<S> {
    storage: S,
}

impl<S: Storage> SessionGate<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn identity(&self) -> anyhow::Result<Option<String>> {
        let stored = self.storage.get(USERNAME_KEY)?;
        Ok(stored.filter(|name| !name.trim().is_empty()))
    }

    pub fn is_authenticated(&self) -> anyhow::Result<bool> {
        Ok(self.identity()?.is_some())
    }

    /// Stores `name` as the identity and returns the landing route.
    #[tracing::instrument(skip(self))]
    pub fn login(&self, name: &str) -> Result<Route, SessionError> {
        if name.trim().is_empty() {
            return Err(SessionError::EmptyName);
        }
        self.storage.set(USERNAME_KEY, name)?;
        info!("logged in");
        Ok(Route::Dashboard)
    }

    /// Resolves a navigation target, sending unauthenticated callers to the
    /// entry route.
    pub fn guard(&self, target: Route) -> anyhow::Result<Route> {
        if !target.is_protected() || self.is_authenticated()? {
            return Ok(target);
        }
        debug!(%target, "no identity stored; redirecting to entry");
        Ok(Route::Entry)
    }
}
