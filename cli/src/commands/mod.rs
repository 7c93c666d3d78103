mod favorite;
mod helpers;
mod import;
mod search;
mod show;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};

use rotom_core::service::DexService;

pub(crate) use favorite::{cmd_fave, cmd_faves};
pub(crate) use import::{cmd_pull_evolutions, cmd_reset};
pub(crate) use search::{cmd_ev_search, cmd_move_search, cmd_search, cmd_type_search};
pub(crate) use show::cmd_show;

pub(crate) type SharedService = Arc<Mutex<DexService>>;

/// Run a blocking service operation off the async runtime. The PokeAPI
/// client re-enters the runtime from the worker thread, so service calls
/// must never run on the runtime threads themselves.
pub(crate) async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .context("worker thread panicked")?
}

pub(crate) fn lock(service: &SharedService) -> MutexGuard<'_, DexService> {
    service.lock().unwrap_or_else(PoisonError::into_inner)
}
