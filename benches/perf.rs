use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use duoscan::acs_fetch::parse_history_page_json;
use duoscan::fake_source::FakeSource;
use duoscan::match_doc::parse_match_json;
use duoscan::pairing::{self, PairingBook, TraverseOptions};
use duoscan::riot_fetch::parse_matchlist_json;
use duoscan::roster::parse_roster;
use duoscan::source::{MatchDetail, MatchSource, Participant};

const DAY_MS: i64 = 86_400_000;

fn bench_match_parse(c: &mut Criterion) {
    c.bench_function("match_doc_parse", |b| {
        b.iter(|| {
            let detail = parse_match_json(4901000004, black_box(ACS_MATCH_JSON)).unwrap();
            black_box(detail.participants.len());
        })
    });
}

fn bench_history_page_parse(c: &mut Criterion) {
    c.bench_function("history_page_parse", |b| {
        b.iter(|| {
            let ids = parse_history_page_json(black_box(HISTORY_PAGE_JSON));
            black_box(ids.len());
        })
    });
}

fn bench_matchlist_parse(c: &mut Criterion) {
    c.bench_function("matchlist_parse", |b| {
        b.iter(|| {
            let ids = parse_matchlist_json(black_box(MATCHLIST_JSON));
            black_box(ids.len());
        })
    });
}

fn bench_traverse_deep_history(c: &mut Criterion) {
    let roster = parse_roster("alice\nbob").expect("valid roster");
    let mut source = FakeSource::new(10);
    source.add_player("alice", "acct-0");
    source.add_player("bob", "acct-1");
    let cutoff_ms = 1_600_000_000_000;
    for id in 1..=200u64 {
        let partner_team = if id % 3 == 0 { 100 } else { 200 };
        source.insert_match(MatchDetail {
            match_id: id,
            creation_ms: cutoff_ms + id as i64 * 3_600_000,
            game_type: "MATCHED_GAME".to_string(),
            participants: vec![
                participant("alice", Some("acct-0"), 100),
                participant("bob", Some("acct-1"), partner_team),
                participant("Stranger One", None, 100),
                participant("Stranger Two", None, 200),
            ],
        });
    }
    source.insert_match(MatchDetail {
        match_id: 201,
        creation_ms: cutoff_ms - DAY_MS,
        game_type: "MATCHED_GAME".to_string(),
        participants: vec![participant("alice", Some("acct-0"), 100)],
    });

    let subject = roster.get("alice").expect("subject on roster").clone();
    let identity = source.resolve("alice").expect("resolves");
    let opts = TraverseOptions {
        page_budget: 30,
        rate_limit_pause: Duration::ZERO,
        rate_limit_retries: 4,
    };

    c.bench_function("traverse_deep_history", |b| {
        b.iter(|| {
            let mut book = PairingBook::default();
            let t = pairing::traverse(
                &mut source,
                &roster,
                &subject,
                &identity,
                cutoff_ms,
                &opts,
                &mut book,
            )
            .unwrap();
            black_box(t.inspected);
        })
    });
}

fn participant(name: &str, account: Option<&str>, team: u32) -> Participant {
    Participant {
        summoner_name: name.to_string(),
        account_id: account.map(str::to_string),
        team_id: Some(team),
    }
}

criterion_group!(
    perf,
    bench_match_parse,
    bench_history_page_parse,
    bench_matchlist_parse,
    bench_traverse_deep_history
);
criterion_main!(perf);

static ACS_MATCH_JSON: &str = include_str!("../tests/fixtures/acs_match.json");
static HISTORY_PAGE_JSON: &str = include_str!("../tests/fixtures/acs_history_page.json");
static MATCHLIST_JSON: &str = include_str!("../tests/fixtures/riot_matchlist.json");
