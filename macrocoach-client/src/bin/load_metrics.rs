use std::{env, error::Error, fs::File, io::BufReader};

use log::info;
use macrocoach_model::metrics::NewMetric;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    log4rs::init_file("log4rs.yml", Default::default())?;

    let user_id: Uuid = env::args()
        .nth(1)
        .ok_or("usage: load-metrics <user-id> [server-url]")?
        .parse()?;
    let url = env::args()
        .nth(2)
        .unwrap_or_else(|| "http://localhost:8080/".to_owned());

    let file = File::open("metrics.json")?;
    let entries: Vec<NewMetric> = serde_json::from_reader(BufReader::new(file))?;
    info!("Loaded {} entries from metrics.json", entries.len());

    let client = macrocoach_client::create(url);
    macrocoach_client::load_metrics(&client, user_id, &entries).await?;

    Ok(())
}
