use std::path::Path;

use episode_index_lib::EpisodeDatabase;
use tracing_subscriber::EnvFilter;

/// Smoke harness: index the directories given on the command line and
/// print what the database knows afterwards.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db = EpisodeDatabase::open_default()?;

    for directory in std::env::args().skip(1) {
        let new_files = db.scan_directory(Path::new(&directory), false)?;
        println!("{directory}: {new_files} new files indexed");
    }

    let stats = db.get_statistics()?;
    println!(
        "{} files across {} titles ({} MB on disk)",
        stats.total_files, stats.total_anime, stats.database_size_mb
    );
    if let Some(last) = stats.last_indexed {
        println!("last indexed at unix time {last}");
    }

    Ok(())
}
