use std::path::PathBuf;

use anyhow::{Context, Result};

use duoscan::cache_store::CacheStore;
use duoscan::roster::{self, DEFAULT_ROSTER_FILE};
use duoscan::scan::{self, ApiKind};

// Resolves every roster nickname once so the identity cache is warm before
// a real scan. Safe to rerun; cached players cost no network calls.
fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let roster_path =
        parse_path_arg(&args, "--roster").unwrap_or_else(|| PathBuf::from(DEFAULT_ROSTER_FILE));
    let api = parse_api_arg(&args).unwrap_or_else(ApiKind::from_env);
    let roster = roster::load_roster(&roster_path)
        .with_context(|| format!("failed to load roster {}", roster_path.display()))?;

    let cache = CacheStore::open_default();
    println!("Cache dir: {}", cache.dir().display());
    let mut source = scan::build_source(api, cache)?;
    println!(
        "Prefetching {} players via {}:",
        roster.len(),
        source.label()
    );

    let mut failed = 0usize;
    for player in roster.players() {
        match source.resolve(&player.nickname) {
            Ok(identity) => println!("OK  {}: {}", player.nickname, identity.account_id),
            Err(err) => {
                failed += 1;
                println!("ERR {}: {}", player.nickname, err);
            }
        }
    }
    if failed > 0 {
        println!("{failed} of {} players failed to resolve", roster.len());
    }

    Ok(())
}

fn parse_path_arg(args: &[String], flag: &str) -> Option<PathBuf> {
    let eq = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&eq) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next));
        }
    }
    None
}

fn parse_api_arg(args: &[String]) -> Option<ApiKind> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix("--api=") {
            if let Some(kind) = ApiKind::parse(raw) {
                return Some(kind);
            }
        }
        if arg == "--api"
            && let Some(next) = args.get(idx + 1)
            && let Some(kind) = ApiKind::parse(next)
        {
            return Some(kind);
        }
    }
    None
}
