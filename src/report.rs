use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use serde::Serialize;

use crate::error::ScanError;
use crate::pairing::PairingBook;
use crate::roster::{Roster, normalized_key};
use crate::scan::ScanSummary;

const NOT_OK: &str = "NOT OK";
const BOM: &str = "\u{feff}";

// Scored is the full weighted report; Simple mirrors the first-generation
// nickname,result files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSchema {
    Simple,
    Scored,
}

impl ReportSchema {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "simple" => Some(Self::Simple),
            "scored" => Some(Self::Scored),
            _ => None,
        }
    }

    pub fn from_env() -> Self {
        std::env::var("SCAN_REPORT_SCHEMA")
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or(Self::Scored)
    }
}

// point rewards the player's own weight tier plus the weights of everyone
// they queued with; one_point_count singles out weight-1 partners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredRow {
    pub nickname: String,
    pub count: usize,
    pub point: u32,
    #[serde(rename = "onePointCount")]
    pub one_point_count: usize,
    pub list: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimpleRow {
    pub nickname: String,
    pub result: String,
}

pub fn scored_rows(roster: &Roster, summary: &ScanSummary) -> Vec<ScoredRow> {
    summary
        .rows
        .iter()
        .map(|row| match partners_of(&summary.book, &row.key) {
            Some(partners) => {
                let mut point = roster.weight_of(&row.key) / 3 * 2;
                let mut one_point = 0usize;
                for name in partners.keys() {
                    let weight = roster.weight_of(&normalized_key(name));
                    point += weight;
                    if weight == 1 {
                        one_point += 1;
                    }
                }
                ScoredRow {
                    nickname: row.nickname.clone(),
                    count: partners.len(),
                    point,
                    one_point_count: one_point,
                    list: joined_names(partners.keys()),
                }
            }
            None => ScoredRow {
                nickname: row.nickname.clone(),
                count: 0,
                point: 0,
                one_point_count: 0,
                list: String::new(),
            },
        })
        .collect()
}

pub fn simple_rows(summary: &ScanSummary) -> Vec<SimpleRow> {
    summary
        .rows
        .iter()
        .map(|row| {
            let result = match partners_of(&summary.book, &row.key) {
                Some(partners) => {
                    let latest = partners.values().copied().max().unwrap_or(0);
                    format!("{} - {}", format_ms_date(latest), joined_names(partners.keys()))
                }
                None => NOT_OK.to_string(),
            };
            SimpleRow {
                nickname: row.nickname.clone(),
                result,
            }
        })
        .collect()
}

// BOM prefix: the usual consumer is a spreadsheet that mis-sniffs Korean
// nicknames without it.
pub fn write_report(
    path: &Path,
    schema: ReportSchema,
    roster: &Roster,
    summary: &ScanSummary,
) -> Result<(), ScanError> {
    let mut file = File::create(path)?;
    file.write_all(BOM.as_bytes())?;
    let mut writer = csv::Writer::from_writer(file);
    match schema {
        ReportSchema::Scored => {
            for row in scored_rows(roster, summary) {
                writer.serialize(row).map_err(csv_err)?;
            }
        }
        ReportSchema::Simple => {
            for row in simple_rows(summary) {
                writer.serialize(row).map_err(csv_err)?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

// <current local date>.csv, the naming the downstream spreadsheet flow expects
pub fn default_report_path() -> PathBuf {
    PathBuf::from(format!("{}.csv", Local::now().format("%Y-%m-%d")))
}

fn partners_of<'a>(
    book: &'a PairingBook,
    key: &str,
) -> Option<&'a std::collections::BTreeMap<String, i64>> {
    book.partners(key).filter(|partners| !partners.is_empty())
}

fn joined_names<'a>(names: impl Iterator<Item = &'a String>) -> String {
    names.cloned().collect::<Vec<_>>().join("|")
}

// Local date, to line up with the date-named report file.
fn format_ms_date(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d").to_string(),
        _ => "unknown".to_string(),
    }
}

fn csv_err(err: csv::Error) -> ScanError {
    ScanError::Io(std::io::Error::other(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::parse_roster;
    use crate::scan::{PlayerScan, PlayerScanResult, ScanSummary};

    fn summary_for(roster: &Roster, book: PairingBook) -> ScanSummary {
        ScanSummary {
            cutoff_ms: 0,
            rows: roster
                .players()
                .iter()
                .map(|p| PlayerScan {
                    nickname: p.nickname.clone(),
                    key: p.key.clone(),
                    result: PlayerScanResult::Skipped(String::new()),
                })
                .collect(),
            book,
        }
    }

    // local noon, so the rendered local date never straddles midnight
    fn day_ms(year: i32, month: u32, day: u32) -> i64 {
        Local
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn scores_weighted_pairings() {
        let roster = parse_roster("alice,3\nbob,1").unwrap();
        let mut book = PairingBook::default();
        book.record(
            roster.get("alice").unwrap(),
            roster.get("bob").unwrap(),
            day_ms(2026, 7, 3),
        );
        let summary = summary_for(&roster, book);
        let rows = scored_rows(&roster, &summary);
        assert_eq!(
            rows[0],
            ScoredRow {
                nickname: "alice".to_string(),
                count: 1,
                point: 3,
                one_point_count: 1,
                list: "bob".to_string(),
            }
        );
        assert_eq!(
            rows[1],
            ScoredRow {
                nickname: "bob".to_string(),
                count: 1,
                point: 3,
                one_point_count: 0,
                list: "alice".to_string(),
            }
        );
    }

    #[test]
    fn base_points_floor_by_weight_tier() {
        let roster = parse_roster("alice,4\nbob,1\ncarol,2").unwrap();
        let mut book = PairingBook::default();
        let alice = roster.get("alice").unwrap().clone();
        book.record(&alice, roster.get("bob").unwrap(), day_ms(2026, 7, 1));
        book.record(&alice, roster.get("carol").unwrap(), day_ms(2026, 7, 2));
        let summary = summary_for(&roster, book);
        let rows = scored_rows(&roster, &summary);
        // 4/3 floors to 1, doubled, plus partner weights 1 and 2
        assert_eq!(rows[0].point, 5);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].one_point_count, 1);
        assert_eq!(rows[0].list, "bob|carol");
    }

    #[test]
    fn unpaired_players_get_the_sentinel_row() {
        let roster = parse_roster("alice\nbob").unwrap();
        let summary = summary_for(&roster, PairingBook::default());
        let rows = scored_rows(&roster, &summary);
        assert!(rows.iter().all(|r| r.count == 0 && r.point == 0 && r.list.is_empty()));
        let simple = simple_rows(&summary);
        assert!(simple.iter().all(|r| r.result == NOT_OK));
    }

    #[test]
    fn simple_rows_carry_the_latest_shared_date() {
        let roster = parse_roster("alice\nbob\ncarol").unwrap();
        let mut book = PairingBook::default();
        let alice = roster.get("alice").unwrap().clone();
        book.record(&alice, roster.get("carol").unwrap(), day_ms(2026, 6, 20));
        book.record(&alice, roster.get("bob").unwrap(), day_ms(2026, 7, 3));
        let summary = summary_for(&roster, book);
        let simple = simple_rows(&summary);
        assert_eq!(simple[0].result, "2026-07-03 - bob|carol");
    }
}
