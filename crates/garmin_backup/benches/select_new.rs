use criterion::{Criterion, criterion_group, criterion_main};
use garmin_backup::diff::{DEFAULT_MAX_ACTIVITIES, select_new};
use garmin_connect_client::{ActivityId, ActivityRecord};
use std::collections::HashSet;
use std::hint::black_box;

fn records(n: u64) -> Vec<ActivityRecord> {
    (0..n)
        .map(|i| ActivityRecord {
            activity_id: ActivityId::from(10_000_000 + i),
            activity_name: Some(format!("Morning Run: lap {i}")),
            start_time_local: format!("2024-{:02}-{:02} 07:{:02}:00", i % 12 + 1, i % 28 + 1, i % 60),
            activity_type: None,
        })
        .collect()
}

fn bench_select_new(c: &mut Criterion) {
    let remote = records(10_000);
    // Everything but the last 50 is already on disk.
    let local: HashSet<String> = select_new(&remote[..9_950], &HashSet::new(), usize::MAX)
        .into_iter()
        .map(|t| t.canonical_name)
        .collect();

    c.bench_function("select_new_10k_mostly_present", |b| {
        b.iter(|| {
            select_new(
                black_box(&remote),
                black_box(&local),
                DEFAULT_MAX_ACTIVITIES,
            )
        })
    });

    c.bench_function("select_new_10k_empty_destination", |b| {
        let empty = HashSet::new();
        b.iter(|| select_new(black_box(&remote), black_box(&empty), DEFAULT_MAX_ACTIVITIES))
    });
}

criterion_group!(benches, bench_select_new);
criterion_main!(benches);
