use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use colored::Colorize;
use crashstore_store::keys::normalize_dump_name;
use crashstore_store::{open_storage, CrashStorage, CrashStoreConfig, HealthState};
use crashstore_types::{CrashId, DumpSet, RawCrash};

use crate::cli::*;

/// Namespace under which the store reports its configuration.
const CONFIG_NAMESPACE: &str = "crashstorage";

/// Subdirectory of `load --out` that holds the dump files.
const DUMPS_DIR: &str = "dumps";

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => CrashStoreConfig::load(path)?,
        None => CrashStoreConfig::default(),
    };
    let store = open_store(&config).await?;
    let store = &*store;

    match cli.command {
        Command::Save(args) => {
            let crash_id = cmd_save(store, args).await?;
            println!("{} Saved {}", "✓".green().bold(), crash_id.to_string().yellow());
            Ok(())
        }
        Command::Load(args) => cmd_load(store, args).await,
        Command::Health => cmd_health(store).await,
        Command::Config => cmd_config(store),
    }
}

async fn open_store(config: &CrashStoreConfig) -> anyhow::Result<Box<dyn CrashStorage>> {
    open_storage(config).await.context("opening crash storage")
}

async fn cmd_save(store: &dyn CrashStorage, args: SaveArgs) -> anyhow::Result<CrashId> {
    let crash_id = match args.crash_id {
        Some(id) => CrashId::parse(id)?,
        None => CrashId::generate(),
    };

    let raw_data = std::fs::read(&args.raw)
        .with_context(|| format!("reading raw crash {}", args.raw.display()))?;
    let raw_crash = RawCrash::from_json_slice(&raw_data)?;

    let mut dumps = DumpSet::new();
    for arg in &args.dumps {
        let (name, path) = parse_dump_arg(arg)?;
        let data = std::fs::read(&path)
            .with_context(|| format!("reading dump {}", path.display()))?;
        if dumps.insert(name.clone(), data).is_some() {
            bail!("dump {name:?} given more than once");
        }
    }

    store.save_crash(&crash_id, &raw_crash, &dumps).await?;
    Ok(crash_id)
}

async fn cmd_load(store: &dyn CrashStorage, args: LoadArgs) -> anyhow::Result<()> {
    let crash_id = CrashId::parse(args.crash_id)?;
    let (raw_crash, dumps) = store.load_crash(&crash_id).await?;

    println!("Crash {}", crash_id.to_string().yellow().bold());
    println!("  Fields: {}", raw_crash.len());
    for (name, data) in dumps.iter() {
        println!("  Dump {:?}: {} bytes", name, data.len());
    }

    if let Some(out) = args.out {
        write_crash(&out, &raw_crash, &dumps)?;
        println!("{} Wrote {}", "✓".green().bold(), out.display());
    }
    Ok(())
}

async fn cmd_health(store: &dyn CrashStorage) -> anyhow::Result<()> {
    let mut state = HealthState::new();
    store.check_health(&mut state).await;
    println!("{}", serde_json::to_string_pretty(&state.to_json())?);
    if !state.is_healthy() {
        bail!("store is unhealthy");
    }
    Ok(())
}

fn cmd_config(store: &dyn CrashStorage) -> anyhow::Result<()> {
    for item in store.runtime_config(&[CONFIG_NAMESPACE.to_string()]) {
        println!("{} = {}", item.qualified_key().bold(), item.value.cyan());
        if !item.doc.is_empty() {
            println!("    {}", item.doc.dimmed());
        }
    }
    Ok(())
}

/// Split `NAME=FILE`. The name may be empty; the file may not.
fn parse_dump_arg(arg: &str) -> anyhow::Result<(String, PathBuf)> {
    let Some((name, path)) = arg.split_once('=') else {
        bail!("expected NAME=FILE, got {arg:?}");
    };
    if path.is_empty() {
        bail!("missing file in {arg:?}");
    }
    Ok((name.to_string(), PathBuf::from(path)))
}

/// Write `raw_crash.json` plus `dumps/<slot>` for every dump.
fn write_crash(out: &Path, raw_crash: &RawCrash, dumps: &DumpSet) -> anyhow::Result<()> {
    let dumps_dir = out.join(DUMPS_DIR);
    std::fs::create_dir_all(&dumps_dir)
        .with_context(|| format!("creating {}", dumps_dir.display()))?;
    std::fs::write(out.join("raw_crash.json"), raw_crash.to_canonical_json()?)?;
    for (name, data) in dumps.iter() {
        std::fs::write(dumps_dir.join(normalize_dump_name(Some(name))), data)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crashstore_store::{ConnectionConfig, FsConnectionConfig, StorageConfig, StorageKind};

    #[test]
    fn parse_named_dump() {
        let (name, path) = parse_dump_arg("browser=/tmp/b.dmp").unwrap();
        assert_eq!(name, "browser");
        assert_eq!(path, PathBuf::from("/tmp/b.dmp"));
    }

    #[test]
    fn parse_unnamed_dump() {
        let (name, path) = parse_dump_arg("=minidump.dmp").unwrap();
        assert_eq!(name, "");
        assert_eq!(path, PathBuf::from("minidump.dmp"));
    }

    #[test]
    fn reject_malformed_dump_args() {
        assert!(parse_dump_arg("no-equals").is_err());
        assert!(parse_dump_arg("name=").is_err());
    }

    #[tokio::test]
    async fn save_then_load_through_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let config = CrashStoreConfig {
            connection: ConnectionConfig::Filesystem(FsConnectionConfig {
                root: dir.path().join("store"),
                create: true,
                verify: true,
            }),
            ..Default::default()
        };
        let store = open_store(&config).await.unwrap();

        let raw_path = dir.path().join("raw.json");
        std::fs::write(&raw_path, br#"{"ProductName":"Firefox","Version":"60.0"}"#).unwrap();
        let dump_path = dir.path().join("mini.dmp");
        std::fs::write(&dump_path, b"MDMP").unwrap();

        let crash_id = cmd_save(
            &*store,
            SaveArgs {
                raw: raw_path,
                dumps: vec![format!("upload_file_minidump={}", dump_path.display())],
                crash_id: None,
            },
        )
        .await
        .unwrap();

        let out = dir.path().join("out");
        cmd_load(
            &*store,
            LoadArgs {
                crash_id: crash_id.to_string(),
                out: Some(out.clone()),
            },
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(out.join("dumps/dump")).unwrap(), b"MDMP");
        let raw = RawCrash::from_json_slice(&std::fs::read(out.join("raw_crash.json")).unwrap())
            .unwrap();
        assert_eq!(raw.get("ProductName"), Some(&serde_json::json!("Firefox")));
    }

    #[tokio::test]
    async fn save_rejects_malformed_crash_id() {
        let dir = tempfile::tempdir().unwrap();
        let config = CrashStoreConfig {
            connection: ConnectionConfig::Memory,
            ..Default::default()
        };
        let store = open_store(&config).await.unwrap();
        let raw_path = dir.path().join("raw.json");
        std::fs::write(&raw_path, b"{}").unwrap();

        let result = cmd_save(
            &*store,
            SaveArgs {
                raw: raw_path,
                dumps: Vec::new(),
                crash_id: Some("short".into()),
            },
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn health_passes_for_memory_store() {
        let config = CrashStoreConfig {
            connection: ConnectionConfig::Memory,
            ..Default::default()
        };
        let store = open_store(&config).await.unwrap();
        cmd_health(&*store).await.unwrap();
        cmd_config(&*store).unwrap();
    }

    #[test]
    fn dump_named_like_raw_crash_file_keeps_both() {
        let dir = tempfile::tempdir().unwrap();
        let mut raw_crash = RawCrash::new();
        raw_crash.insert("ProductName", "Firefox");
        let mut dumps = DumpSet::new();
        dumps.insert("raw_crash.json", b"not the raw crash".to_vec());

        let out = dir.path().join("out");
        write_crash(&out, &raw_crash, &dumps).unwrap();

        let raw = RawCrash::from_json_slice(&std::fs::read(out.join("raw_crash.json")).unwrap())
            .unwrap();
        assert_eq!(raw, raw_crash);
        assert_eq!(
            std::fs::read(out.join("dumps/raw_crash.json")).unwrap(),
            b"not the raw crash"
        );
    }

    #[tokio::test]
    async fn noop_storage_is_selected_by_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = CrashStoreConfig {
            storage: StorageConfig {
                kind: StorageKind::Noop,
            },
            ..Default::default()
        };
        let store = open_store(&config).await.unwrap();
        let raw_path = dir.path().join("raw.json");
        std::fs::write(&raw_path, br#"{"ProductName":"Firefox"}"#).unwrap();

        let crash_id = cmd_save(
            &*store,
            SaveArgs {
                raw: raw_path,
                dumps: Vec::new(),
                crash_id: None,
            },
        )
        .await
        .unwrap();
        let (raw, dumps) = store.load_crash(&crash_id).await.unwrap();
        assert_eq!(raw.get("ProductName"), Some(&serde_json::json!("Firefox")));
        assert!(dumps.is_empty());
        cmd_health(&*store).await.unwrap();
        cmd_config(&*store).unwrap();
    }
}
