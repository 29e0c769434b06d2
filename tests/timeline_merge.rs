// tests/timeline_merge.rs
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use ilog_timeline::timeline::group::{group_by_date, offset_from_hours};
use ilog_timeline::timeline::merge::{merge_and_sort, merge_batches};
use ilog_timeline::timeline::sources::{BilibiliVideo, JianshuArticle};
use ilog_timeline::timeline::transform::transform;
use ilog_timeline::TimelineItem;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
}

fn video(i: usize, published: &str) -> TimelineItem {
    let v = BilibiliVideo {
        title: Some(format!("v{i}")),
        url: Some(format!("https://b/{i}")),
        published_at: Some(published.to_string()),
        ..Default::default()
    };
    transform(&v, i, None, now()).expect("fixture record is valid")
}

fn article(i: usize, published: &str) -> TimelineItem {
    let a = JianshuArticle {
        title: Some(format!("a{i}")),
        link: Some(format!("https://j/p/{i}")),
        published_at: Some(published.to_string()),
        ..Default::default()
    };
    transform(&a, i, None, now()).expect("fixture record is valid")
}

#[test]
fn newer_item_comes_first() {
    let a = video(0, "2024-01-10T00:00:00Z");
    let b = article(0, "2024-01-12T00:00:00Z");
    let out = merge_batches(vec![vec![a.clone()], vec![b.clone()]]);
    assert_eq!(out, vec![b, a]);
}

#[test]
fn ties_keep_input_order() {
    let ts = "2024-01-10T00:00:00Z";
    let items = vec![video(0, ts), article(0, ts), video(1, ts)];
    let ids: Vec<_> = merge_and_sort(items).into_iter().map(|i| i.id).collect();
    assert_eq!(ids, vec!["bilibili-0", "jianshu-0", "bilibili-1"]);
}

#[test]
fn shuffled_input_sorts_descending_and_keeps_every_id() {
    let mut rng = StdRng::seed_from_u64(0x1106);
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let mut items = Vec::new();
    for i in 0..200 {
        let ts = base + Duration::minutes(rng.random_range(0..60 * 24 * 30));
        let ts = ts.to_rfc3339();
        items.push(if i % 2 == 0 { video(i, &ts) } else { article(i, &ts) });
    }
    items.shuffle(&mut rng);

    let mut before: Vec<String> = items.iter().map(|i| i.id.clone()).collect();
    let out = merge_and_sort(items);

    for pair in out.windows(2) {
        assert!(
            pair[0].published_at >= pair[1].published_at,
            "{} before {}",
            pair[0].published_at,
            pair[1].published_at
        );
    }

    let mut after: Vec<String> = out.iter().map(|i| i.id.clone()).collect();
    before.sort();
    after.sort();
    assert_eq!(before, after);
}

#[test]
fn groups_follow_local_calendar_days() {
    // 2024-01-14T17:00Z is already the 15th at +08:00.
    let items = merge_batches(vec![
        vec![video(0, "2024-01-15T02:00:00Z"), video(1, "2024-01-14T17:00:00Z")],
        vec![article(0, "2024-01-14T15:00:00Z")],
    ]);

    let groups = group_by_date(items.clone(), offset_from_hours(8));
    let shape: Vec<(String, usize)> = groups
        .iter()
        .map(|g| (g.date.to_string(), g.items.len()))
        .collect();
    assert_eq!(
        shape,
        vec![("2024-01-15".to_string(), 2), ("2024-01-14".to_string(), 1)]
    );

    let in_utc = group_by_date(items, offset_from_hours(0));
    assert_eq!(in_utc.len(), 2);
    assert_eq!(in_utc[0].items.len(), 1);
    assert_eq!(in_utc[1].items.len(), 2);

    let wire = serde_json::to_value(&groups).unwrap();
    assert_eq!(wire[0]["date"], "2024-01-15");
}

#[test]
fn grouping_empty_feed_yields_no_groups() {
    assert!(group_by_date(Vec::new(), offset_from_hours(8)).is_empty());
}
