use crate::index::persist;
use anyhow::Result;
use std::path::Path;

/// Number of inverted lists shown by `stats`
const LARGEST_LISTS: usize = 10;

/// Display statistics of the index saved in `index_dir`
pub fn show_stats(index_dir: &Path) -> Result<()> {
    let (store, meta) = persist::load(index_dir)?;

    println!("Index Statistics");
    println!("================");
    println!();
    println!("Index location:   {}", index_dir.display());
    println!("Format version:   {}", meta.version);
    println!("Generation:       {}", meta.generation);
    println!("Q-gram length:    {}", meta.qgram_len);
    println!("Indexed strings:  {}", meta.string_count);
    println!("Distinct q-grams: {}", meta.qgram_count);
    println!("Authors:          {}", meta.author_count);

    if let Some(snapshot) = store.published() {
        let lists = snapshot.largest_lists(LARGEST_LISTS);
        if !lists.is_empty() {
            println!();
            println!("Largest inverted lists:");
            for (qgram, cardinality) in lists {
                println!("  {:?} {:>8}", qgram, cardinality);
            }
        }
    }

    if let Ok(size) = dir_size(index_dir) {
        println!();
        println!("Index size:       {}", format_size(size));
    }

    println!();
    println!("Created:          {}", format_timestamp(meta.created_at));

    Ok(())
}

/// Total size of the files directly inside `path`
fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut size = 0;
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        if entry.path().is_file() {
            size += entry.metadata()?.len();
        }
    }
    Ok(size)
}

/// Format byte size to human readable
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format unix timestamp
fn format_timestamp(ts: u64) -> String {
    use std::time::{Duration, UNIX_EPOCH};
    let datetime = UNIX_EPOCH + Duration::from_secs(ts);
    format!("{:?}", datetime)
}
