use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;

use crate::api::server::RouteError;
use crate::league::seed::{self, SeasonBootstrap};
use crate::league::service::{LeagueError, LeagueService};
use crate::store::StoreError;
use crate::store::memory::MemoryStore;
use crate::store::port::DocumentStore;
use crate::store::redis::RedisStore;
use crate::util::env::{Env, EnvErr};

mod api;
mod league;
mod store;
mod util;

#[derive(Debug, Error)]
enum RunnerErr {
    #[error(transparent)]
    Env(#[from] EnvErr),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    League(#[from] LeagueError),

    #[error(transparent)]
    Route(#[from] RouteError),
}

type Result<T> = core::result::Result<T, RunnerErr>;

#[tokio::main]
async fn main() -> Result<()> {
    util::trace::init();
    tracing::info!("starting league server");

    let env = Env::load()?;

    let store: Arc<dyn DocumentStore> = match &env.redis_url {
        Some(url) => {
            tracing::info!("using redis document store");
            Arc::new(RedisStore::connect(url).await?)
        }
        None => {
            tracing::info!("no REDIS_URL set; using in-memory document store");
            Arc::new(MemoryStore::new())
        }
    };

    if env.seed_demo_season {
        let bootstrap = SeasonBootstrap::new();
        let season = seed::demo_season();
        if bootstrap.ensure_seeded(store.as_ref(), &season).await? {
            tracing::info!("fresh store detected; demo season seeded");
        }
    }

    let service = LeagueService::new(store);
    service.refresh_all().await?;

    let mut handles = Vec::new();
    handles.extend(Arc::clone(&service).run().await?);
    handles.extend(api::server::start_server(Arc::clone(&service), env.api_port).await?);

    _ = join_all(handles).await;
    Ok(())
}
