//! History upsert stress tool
//!
//! Fires concurrent submissions for a single (crew member, service number)
//! pair and checks that none of them was lost.
//!
//! Run with: cargo run --bin upsert_stress --release -- --tasks 50 --rounds 20

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveTime;
use sqlx::postgres::PgPoolOptions;

use guarda_freios::history::{
    HistoryKey, HistoryStore, HistorySubmission, PgHistoryStore, ServiceFields,
};

fn arg_or(args: &[String], flag: &str, default: usize) -> usize {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let tasks = arg_or(&args, "--tasks", 50);
    let rounds = arg_or(&args, "--rounds", 20);

    let database_url = std::env::var("DATABASE_URL")?;

    println!("Upsert stress - {} tasks x {} rounds", tasks, rounds);
    println!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await?;

    let store = Arc::new(PgHistoryStore::new(pool.clone()));
    let key = HistoryKey::new(
        "stress",
        format!("S-{}", uuid::Uuid::new_v4().simple()),
    );

    let start_time = NaiveTime::from_hms_opt(7, 30, 0)
        .ok_or_else(|| anyhow::anyhow!("invalid start time"))?;
    let end_time = NaiveTime::from_hms_opt(15, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("invalid end time"))?;

    let start = Instant::now();
    let mut handles = Vec::with_capacity(tasks);

    for task in 0..tasks {
        let store = Arc::clone(&store);
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            let mut ok = 0u64;
            for round in 0..rounds {
                let submission = HistorySubmission {
                    key: key.clone(),
                    fields: ServiceFields {
                        start_location: "Garagem".to_string(),
                        end_location: "Terminal".to_string(),
                        start_time,
                        end_time,
                        // Alternate plates so the edit counter moves too
                        vehicle_plate: format!("{}", 500 + (task + round) % 3),
                        assignment: "12E".to_string(),
                    },
                };
                match store.upsert(submission).await {
                    Ok(_) => ok += 1,
                    Err(e) => eprintln!("task {task} round {round}: {e}"),
                }
            }
            ok
        }));
    }

    let mut succeeded = 0u64;
    for handle in handles {
        succeeded += handle.await?;
    }

    let elapsed = start.elapsed();
    let history = store
        .get(&key)
        .await?
        .ok_or_else(|| anyhow::anyhow!("history row missing after stress run"))?;

    println!("\n=== Upsert Stress Results ===");
    println!("Submissions: {}", tasks * rounds);
    println!("Successful: {}", succeeded);
    println!("Stored count: {}", history.repeat_count);
    println!("Stored edits: {}", history.edit_count);
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!(
        "Rate: {:.0} upserts/sec",
        succeeded as f64 / elapsed.as_secs_f64()
    );

    store.delete(&key).await?;
    pool.close().await;

    if i64::from(history.repeat_count) != succeeded as i64 {
        anyhow::bail!(
            "lost updates: {} successful submissions but count is {}",
            succeeded,
            history.repeat_count
        );
    }

    println!("No lost updates.");
    Ok(())
}
