//! On-disk form of a published generation.
//!
//! Layout of an index directory:
//!
//! - `dense.bin`: name rows as `id, text, surname, authors`
//! - `variants.bin`: variant cache rows as `author, n, n * (text, occurrences)`
//! - `grams.bin`: inverted lists as `qgram, cardinality, ids`
//! - `meta.json`: [`IndexMeta`]
//!
//! Every `.bin` file starts with a header of two little-endian u64s, the
//! save id and generation of the `meta.json` it was written with, followed
//! by a u32 record count. Strings and id sets are u32 length-prefixed; id
//! sets are stored exactly as the codec of the building engine produced them.
//!
//! A save is written into a sibling staging directory and renamed over the
//! target, so a reader sees either the old generation or the new one.

use crate::index::memory::{GramEntry, MemorySnapshot, MemoryStore, NameEntry};
use crate::index::types::IndexMeta;
use crate::utils::{
    EngineConfig, read_bytes, read_string, read_u32_le, read_u64_le, write_bytes, write_u32_le,
    write_u64_le,
};
use anyhow::{Context, Result, bail};
use log::{info, warn};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const META_FILE: &str = "meta.json";
const DENSE_FILE: &str = "dense.bin";
const VARIANTS_FILE: &str = "variants.bin";
const GRAMS_FILE: &str = "grams.bin";

/// Format version written to meta.json
pub const FORMAT_VERSION: u32 = 2;

/// Write the published generation of `store` into `dir`, replacing any
/// index already there
pub fn save(store: &MemoryStore, dir: &Path, config: &EngineConfig) -> Result<IndexMeta> {
    let Some(snapshot) = store.published() else {
        bail!("No published index generation to save");
    };

    let created_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let meta = IndexMeta {
        version: FORMAT_VERSION,
        generation: snapshot.generation(),
        save_id: next_save_id(),
        qgram_len: config.qgram_len,
        string_count: snapshot.string_count() as u32,
        qgram_count: snapshot.qgram_count() as u32,
        author_count: snapshot.author_count() as u32,
        created_at,
    };

    let staging = sibling(dir, &format!("{:016x}.tmp", meta.save_id))?;
    if let Err(e) = write_generation(&snapshot, &meta, &staging) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }
    swap_into_place(&staging, dir, meta.save_id)?;

    info!(
        "Saved generation {} to {}",
        meta.generation,
        dir.display()
    );
    Ok(meta)
}

/// Read the metadata of a saved index
pub fn load_meta(dir: &Path) -> Result<IndexMeta> {
    let meta_path = dir.join(META_FILE);
    let file = File::open(&meta_path)
        .with_context(|| format!("Failed to open {}", meta_path.display()))?;
    let meta: IndexMeta = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", meta_path.display()))?;
    if meta.version != FORMAT_VERSION {
        bail!(
            "Unsupported index format version {} (expected {})",
            meta.version,
            FORMAT_VERSION
        );
    }
    Ok(meta)
}

/// Load a saved index into a store with that generation published
pub fn load(dir: &Path) -> Result<(MemoryStore, IndexMeta)> {
    let meta = load_meta(dir)?;

    let mut snapshot = MemorySnapshot {
        generation: meta.generation,
        ..MemorySnapshot::default()
    };
    read_dense(&mut snapshot, &meta, &dir.join(DENSE_FILE))?;
    read_variants(&mut snapshot, &meta, &dir.join(VARIANTS_FILE))?;
    read_grams(&mut snapshot, &meta, &dir.join(GRAMS_FILE))?;

    if snapshot.string_count() != meta.string_count as usize
        || snapshot.qgram_count() != meta.qgram_count as usize
    {
        bail!(
            "Index in {} does not match its metadata ({} strings, {} q-grams on disk)",
            dir.display(),
            snapshot.string_count(),
            snapshot.qgram_count()
        );
    }

    info!(
        "Loaded generation {} from {} ({} strings)",
        meta.generation,
        dir.display(),
        meta.string_count
    );
    Ok((MemoryStore::from_snapshot(snapshot), meta))
}

/// Distinct for every save made by any process
fn next_save_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let pid = u64::from(std::process::id());
    nanos ^ pid.rotate_left(40) ^ COUNTER.fetch_add(1, Ordering::Relaxed).rotate_left(20)
}

/// `<parent>/.<name>.<suffix>` next to `dir`, on the same filesystem
fn sibling(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let Some(name) = dir.file_name() else {
        bail!("Index directory {} has no name", dir.display());
    };
    let name = format!(".{}.{}", name.to_string_lossy(), suffix);
    Ok(dir.with_file_name(name))
}

fn write_generation(snapshot: &MemorySnapshot, meta: &IndexMeta, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create index directory {}", dir.display()))?;

    write_dense(snapshot, meta, &dir.join(DENSE_FILE))?;
    write_variants(snapshot, meta, &dir.join(VARIANTS_FILE))?;
    write_grams(snapshot, meta, &dir.join(GRAMS_FILE))?;

    let meta_path = dir.join(META_FILE);
    let mut file = create(&meta_path)?;
    serde_json::to_writer_pretty(&mut file, meta)?;
    file.flush()?;
    Ok(())
}

/// Replace `dir` with the fully written `staging` directory
fn swap_into_place(staging: &Path, dir: &Path, save_id: u64) -> Result<()> {
    if !dir.exists() {
        return fs::rename(staging, dir)
            .with_context(|| format!("Failed to move index into {}", dir.display()));
    }

    let retired = sibling(dir, &format!("{:016x}.old", save_id))?;
    fs::rename(dir, &retired)
        .with_context(|| format!("Failed to move aside {}", dir.display()))?;
    if let Err(e) = fs::rename(staging, dir) {
        let _ = fs::rename(&retired, dir);
        let _ = fs::remove_dir_all(staging);
        return Err(e).with_context(|| format!("Failed to move index into {}", dir.display()));
    }
    if let Err(e) = fs::remove_dir_all(&retired) {
        warn!("Failed to remove replaced index {}: {}", retired.display(), e);
    }
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn write_header<W: Write>(writer: &mut W, meta: &IndexMeta) -> Result<()> {
    write_u64_le(writer, meta.save_id)?;
    write_u64_le(writer, meta.generation)?;
    Ok(())
}

/// Reject a data file left behind by a different save than `meta`
fn read_header<R: Read>(reader: &mut R, meta: &IndexMeta, path: &Path) -> Result<()> {
    let save_id = read_u64_le(reader)
        .with_context(|| format!("Missing header in {}", path.display()))?;
    let generation = read_u64_le(reader)
        .with_context(|| format!("Missing header in {}", path.display()))?;
    let header = (save_id, generation);
    if header != (meta.save_id, meta.generation) {
        bail!(
            "{} belongs to generation {} (save {:016x}), but {} describes generation {} (save {:016x})",
            path.display(),
            header.1,
            header.0,
            META_FILE,
            meta.generation,
            meta.save_id
        );
    }
    Ok(())
}

fn write_dense(snapshot: &MemorySnapshot, meta: &IndexMeta, path: &Path) -> Result<()> {
    let mut file = create(path)?;
    write_header(&mut file, meta)?;
    write_u32_le(&mut file, snapshot.names.len() as u32)?;
    for (id, entry) in &snapshot.names {
        write_u32_le(&mut file, *id)?;
        write_bytes(&mut file, entry.text.as_bytes())?;
        write_bytes(&mut file, entry.surname.as_bytes())?;
        write_bytes(&mut file, &entry.authors)?;
    }
    file.flush()?;
    Ok(())
}

fn write_variants(snapshot: &MemorySnapshot, meta: &IndexMeta, path: &Path) -> Result<()> {
    let mut authors: Vec<_> = snapshot.variants.iter().collect();
    authors.sort_by_key(|(author, _)| **author);

    let mut file = create(path)?;
    write_header(&mut file, meta)?;
    write_u32_le(&mut file, authors.len() as u32)?;
    for (author, variants) in authors {
        write_u32_le(&mut file, *author)?;
        write_u32_le(&mut file, variants.len() as u32)?;
        for (text, occurrences) in variants {
            write_bytes(&mut file, text.as_bytes())?;
            write_u64_le(&mut file, *occurrences)?;
        }
    }
    file.flush()?;
    Ok(())
}

fn write_grams(snapshot: &MemorySnapshot, meta: &IndexMeta, path: &Path) -> Result<()> {
    let mut grams: Vec<_> = snapshot.grams.iter().collect();
    grams.sort_by(|a, b| a.0.cmp(b.0));

    let mut file = create(path)?;
    write_header(&mut file, meta)?;
    write_u32_le(&mut file, grams.len() as u32)?;
    for (qgram, entry) in grams {
        write_bytes(&mut file, qgram.as_bytes())?;
        write_u32_le(&mut file, entry.cardinality as u32)?;
        write_bytes(&mut file, &entry.ids)?;
    }
    file.flush()?;
    Ok(())
}

fn read_dense(snapshot: &mut MemorySnapshot, meta: &IndexMeta, path: &Path) -> Result<()> {
    let mut file = open(path)?;
    read_header(&mut file, meta, path)?;
    let count = read_u32_le(&mut file)?;
    for i in 0..count {
        let entry = read_name(&mut file)
            .with_context(|| format!("Corrupt name row {} in {}", i, path.display()))?;
        snapshot.names.insert(entry.0, entry.1);
    }
    Ok(())
}

fn read_name<R: Read>(reader: &mut R) -> Result<(u32, NameEntry)> {
    let id = read_u32_le(reader)?;
    let text = read_string(reader)?;
    let surname = read_string(reader)?;
    let authors = read_bytes(reader)?;
    Ok((
        id,
        NameEntry {
            text,
            authors,
            surname,
        },
    ))
}

fn read_variants(snapshot: &mut MemorySnapshot, meta: &IndexMeta, path: &Path) -> Result<()> {
    let mut file = open(path)?;
    read_header(&mut file, meta, path)?;
    let count = read_u32_le(&mut file)?;
    for i in 0..count {
        let read = |file: &mut BufReader<File>| -> Result<(u32, Vec<(String, u64)>)> {
            let author = read_u32_le(file)?;
            let n = read_u32_le(file)?;
            let mut variants = Vec::with_capacity(n as usize);
            for _ in 0..n {
                let text = read_string(file)?;
                let occurrences = read_u64_le(file)?;
                variants.push((text, occurrences));
            }
            Ok((author, variants))
        };
        let (author, variants) = read(&mut file)
            .with_context(|| format!("Corrupt variant row {} in {}", i, path.display()))?;
        snapshot.variants.insert(author, variants);
    }
    Ok(())
}

fn read_grams(snapshot: &mut MemorySnapshot, meta: &IndexMeta, path: &Path) -> Result<()> {
    let mut file = open(path)?;
    read_header(&mut file, meta, path)?;
    let count = read_u32_le(&mut file)?;
    snapshot.grams.reserve(count as usize);
    for i in 0..count {
        let read = |file: &mut BufReader<File>| -> Result<(String, GramEntry)> {
            let qgram = read_string(file)?;
            let cardinality = read_u32_le(file)? as usize;
            let ids = read_bytes(file)?;
            Ok((qgram, GramEntry { ids, cardinality }))
        };
        let (qgram, entry) = read(&mut file)
            .with_context(|| format!("Corrupt inverted list {} in {}", i, path.display()))?;
        snapshot.grams.insert(qgram, entry);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build::IndexBuilder;
    use crate::index::catalog::NameCatalog;
    use crate::index::store::IndexStore;
    use crate::utils::{DefaultNormalizer, DeltaVarintCodec};
    use tempfile::TempDir;

    fn built_store() -> MemoryStore {
        store_of(&[(10, "Ellis, J"), (10, "Ellis, John"), (20, "Smith, J")])
    }

    fn store_of(signatures: &[(u32, &str)]) -> MemoryStore {
        let mut catalog = NameCatalog::new();
        for (author, name) in signatures {
            catalog.add_signature(*author, name);
        }
        let store = MemoryStore::new();
        IndexBuilder::new(&catalog, &DefaultNormalizer, &DeltaVarintCodec, 2)
            .build(&store)
            .unwrap();
        store
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = built_store();
        let meta = save(&store, dir.path(), &EngineConfig::default()).unwrap();
        assert_eq!(meta.string_count, 5);
        assert_eq!(meta.author_count, 2);

        let (loaded, loaded_meta) = load(dir.path()).unwrap();
        assert_eq!(loaded_meta.generation, meta.generation);
        assert_eq!(loaded.current().unwrap().generation(), meta.generation);

        let original = store.published().unwrap();
        let restored = loaded.published().unwrap();
        assert_eq!(original.names, restored.names);
        assert_eq!(original.grams, restored.grams);
        assert_eq!(original.variants, restored.variants);
    }

    #[test]
    fn test_save_requires_published_generation() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        assert!(save(&store, dir.path(), &EngineConfig::default()).is_err());
    }

    #[test]
    fn test_load_missing_meta() {
        let dir = TempDir::new().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(err.to_string().contains(META_FILE));
    }

    #[test]
    fn test_load_truncated_file() {
        let dir = TempDir::new().unwrap();
        save(&built_store(), dir.path(), &EngineConfig::default()).unwrap();
        let grams = dir.path().join(GRAMS_FILE);
        let bytes = fs::read(&grams).unwrap();
        fs::write(&grams, &bytes[..bytes.len() / 2]).unwrap();
        assert!(load(dir.path()).is_err());
    }

    #[test]
    fn test_load_rejects_file_from_another_save() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        save(&store_of(&[(10, "Ellis, J")]), a.path(), &EngineConfig::default()).unwrap();
        save(&store_of(&[(20, "Smith, J")]), b.path(), &EngineConfig::default()).unwrap();

        // Same generation number, different save
        fs::copy(b.path().join(DENSE_FILE), a.path().join(DENSE_FILE)).unwrap();
        let err = load(a.path()).unwrap_err();
        assert!(err.to_string().contains(DENSE_FILE));
    }

    #[test]
    fn test_resave_replaces_index() {
        let parent = TempDir::new().unwrap();
        let dir = parent.path().join("index");
        save(&store_of(&[(10, "Ellis, J")]), &dir, &EngineConfig::default()).unwrap();
        let meta = save(&store_of(&[(20, "Smith, J")]), &dir, &EngineConfig::default()).unwrap();

        let (loaded, loaded_meta) = load(&dir).unwrap();
        assert_eq!(loaded_meta.save_id, meta.save_id);
        let restored = loaded.published().unwrap();
        assert!(restored.variants.contains_key(&20));
        assert!(!restored.variants.contains_key(&10));

        let entries: Vec<_> = fs::read_dir(parent.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("index")]);
    }
}
