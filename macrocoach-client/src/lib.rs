mod client;

pub use client::{create, Client, ClientImpl, Error, MockClient};

use log::{info, warn};
use macrocoach_model::metrics::NewMetric;
use uuid::Uuid;

/// Posts every entry for `user_id`, skipping entries the server rejects as
/// invalid. Returns how many were stored.
pub async fn load_metrics(
    client: &dyn Client,
    user_id: Uuid,
    entries: &[NewMetric],
) -> Result<usize, Error> {
    let mut stored = 0;
    for (i, entry) in entries.iter().enumerate() {
        match client.post_metric(user_id, entry).await {
            Ok(_) => stored += 1,
            Err(Error::RequestError) => warn!("Entry #{} rejected by server, skipping", i),
            Err(e) => return Err(e),
        }
    }
    info!("Stored {} of {} entries", stored, entries.len());
    Ok(stored)
}
