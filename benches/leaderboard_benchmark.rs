use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use reward_ledger::models::{LedgerEntry, UserProfile};
use reward_ledger::services::leaderboard::{build_rows, top_entries};
use std::collections::HashMap;
use std::hint::black_box;

/// Ledgers with clustered scores so ties exercise the secondary keys.
fn fixture(count: usize) -> (Vec<LedgerEntry>, HashMap<String, UserProfile>) {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut entries = Vec::with_capacity(count);
    let mut profiles = HashMap::new();

    for i in 0..count {
        let user_id = format!("user-{:06}", i);
        let at = base + Duration::minutes((i * 7919 % 10_000) as i64);
        let mut entry = LedgerEntry::new(&user_id, at);
        entry.total_points = ((i * 104_729) % 5_000) as u64 / 10 * 10;
        entry.last_activity = at;
        entries.push(entry);

        // Every fifth user has no profile
        if i % 5 != 0 {
            profiles.insert(
                user_id.clone(),
                UserProfile {
                    id: user_id,
                    username: Some(format!("player{}", i)),
                    email: None,
                },
            );
        }
    }
    (entries, profiles)
}

fn benchmark_leaderboard(c: &mut Criterion) {
    let (entries, profiles) = fixture(10_000);

    let mut group = c.benchmark_group("leaderboard");

    group.bench_function("top_10_of_10k", |b| {
        b.iter(|| top_entries(black_box(entries.clone()), 10))
    });

    group.bench_function("top_100_of_10k_with_names", |b| {
        b.iter(|| {
            let ranked = top_entries(black_box(entries.clone()), 100);
            build_rows(&ranked, black_box(&profiles))
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_leaderboard);
criterion_main!(benches);
