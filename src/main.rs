use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;

use duoscan::cache_store::CacheStore;
use duoscan::fake_source::FakeSource;
use duoscan::report::{self, ReportSchema};
use duoscan::roster::{self, DEFAULT_ROSTER_FILE};
use duoscan::scan::{self, ApiKind, PlayerScanResult, ScanOptions, ScanProgress, ScanSummary};
use duoscan::source::MatchSource;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let cutoff = parse_cutoff_arg(&args)?;
    let roster_path =
        parse_path_arg(&args, "--roster").unwrap_or_else(|| PathBuf::from(DEFAULT_ROSTER_FILE));
    let out_path = parse_path_arg(&args, "--out").unwrap_or_else(report::default_report_path);
    let offline = args.iter().any(|a| a == "--offline");
    let api = parse_api_arg(&args).unwrap_or_else(ApiKind::from_env);

    let roster = roster::load_roster(&roster_path)
        .with_context(|| format!("failed to load roster {}", roster_path.display()))?;
    println!(
        "[INFO] Roster: {} players from {}",
        roster.len(),
        roster_path.display()
    );

    let opts = ScanOptions::from_env();
    let mut source: Box<dyn MatchSource> = if offline {
        println!("[INFO] Offline mode: synthetic histories");
        Box::new(FakeSource::seeded(&roster, scan::cutoff_epoch_ms(cutoff)))
    } else {
        let cache = CacheStore::open_default();
        println!("[INFO] Cache dir: {}", cache.dir().display());
        scan::build_source(api, cache)?
    };
    println!("[INFO] Source: {}", source.label());
    println!("[INFO] Cutoff: {}", cutoff.format("%Y-%m-%d"));

    let summary = scan::run_scan(source.as_mut(), &roster, cutoff, &opts, |p: ScanProgress| {
        println!("[INFO] ({}/{}) {}", p.current, p.total, p.message);
    })?;

    let schema = ReportSchema::from_env();
    report::write_report(&out_path, schema, &roster, &summary)
        .with_context(|| format!("failed to write report {}", out_path.display()))?;

    print_summary(&summary, &out_path);
    Ok(())
}

fn print_summary(summary: &ScanSummary, out_path: &Path) {
    println!("Duo scan complete");
    println!("Players: {}", summary.rows.len());
    let mut paired = 0usize;
    for row in &summary.rows {
        let partners = summary
            .book
            .partners(&row.key)
            .map(|p| p.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        let status = match &row.result {
            PlayerScanResult::Traversed(t) => format!(
                "{}; {} pages, {} matches, {} customs skipped",
                t.stop.label(),
                t.pages,
                t.inspected,
                t.skipped_custom
            ),
            PlayerScanResult::Skipped(reason) => format!("skipped: {reason}"),
            PlayerScanResult::Failed(reason) => format!("failed: {reason}"),
        };
        if partners.is_empty() {
            println!("{}: no pairings [{status}]", row.nickname);
        } else {
            paired += 1;
            println!("{}: {} [{status}]", row.nickname, partners.join("|"));
        }
    }
    println!("Paired players: {paired}/{}", summary.rows.len());
    println!("Report: {}", out_path.display());
}

fn print_usage() {
    println!(
        "usage: duoscan <cutoff YYYY-MM-DD> [--roster PATH] [--out PATH] [--api acs|matchv4] [--offline]"
    );
    println!();
    println!("Walks each tracked player's match history back to the cutoff date and");
    println!("reports which roster members played ranked games on the same team.");
}

fn parse_cutoff_arg(args: &[String]) -> Result<NaiveDate> {
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--roster" || arg == "--out" || arg == "--api" {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        return NaiveDate::parse_from_str(arg.trim(), "%Y-%m-%d")
            .map_err(|_| anyhow!("cutoff date must be YYYY-MM-DD, got {arg:?}"));
    }
    Err(anyhow!("missing cutoff date argument (YYYY-MM-DD)"))
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
