//! Concurrent writers, one per store
//!
//! Every store gets its own blocking writer task. Afterwards each store must
//! hold exactly its writer's bytes: growth on one store neither blocks nor
//! leaks into another.

use bigbuf::{RegistryConfig, StoreRegistry};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

const WRITES_PER_STORE: usize = 10_000;
const CHUNK: usize = 37;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = Arc::new(StoreRegistry::new(RegistryConfig::default())?);
    let stores = registry.config().device_limit;
    let started = Instant::now();

    let mut tasks = Vec::with_capacity(stores);
    for store_id in 0..stores {
        let registry = Arc::clone(&registry);
        tasks.push(tokio::task::spawn_blocking(move || {
            let handle = registry.open(store_id)?;
            #[allow(clippy::cast_possible_truncation)]
            let chunk = [b'A' + (store_id % 26) as u8; CHUNK];
            for _ in 0..WRITES_PER_STORE {
                registry.write(handle, &chunk)?;
            }
            registry.close(handle);
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
        }));
    }
    for task in tasks {
        task.await?.map_err(|e| e as Box<dyn std::error::Error>)?;
    }
    info!(elapsed = ?started.elapsed(), "writers done");

    for store_id in 0..stores {
        #[allow(clippy::cast_possible_truncation)]
        let expected = b'A' + (store_id % 26) as u8;
        let reader = registry.open(store_id)?;
        let data = registry.read(reader, usize::MAX)?;
        registry.close(reader);

        let clean = data.len() == WRITES_PER_STORE * CHUNK && data.iter().all(|&b| b == expected);
        println!(
            "store {store_id}: {} bytes, {}",
            data.len(),
            if clean { "ok" } else { "CORRUPT" }
        );
        if !clean {
            return Err(format!("store {store_id} holds foreign or missing bytes").into());
        }
    }
    Ok(())
}
