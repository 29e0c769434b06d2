// tests/timeline_transform.rs
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use ilog_timeline::timeline::sources::{BilibiliVideo, DoubanRssItem, JianshuArticle, YouTubeVideo};
use ilog_timeline::timeline::transform::{stable_id, transform, transform_batch};
use ilog_timeline::Platform;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap()
}

#[test]
fn video_record_with_iso_timestamp_becomes_item() {
    let v = BilibiliVideo {
        url: Some("https://x/v1".into()),
        published_at: Some("2024-01-15T08:00:00Z".into()),
        ..Default::default()
    };
    let item = transform(&v, 0, None, now()).expect("valid record is kept");
    assert_eq!(item.platform, Platform::Bilibili);
    assert_eq!(item.published_at_iso(), "2024-01-15T08:00:00Z");
    assert_eq!(item.id, "bilibili-0");
    assert_eq!(item.title, "", "missing title becomes empty string");

    let wire = serde_json::to_value(&item).unwrap();
    assert_eq!(wire["platform"], "bilibili");
    assert_eq!(wire["publishedAt"], "2024-01-15T08:00:00Z");
    assert_eq!(wire["metadata"]["type"], "video");
    assert!(wire.get("description").is_none(), "absent optionals are omitted");
}

#[test]
fn article_with_null_timestamp_is_dropped() {
    let a: JianshuArticle = serde_json::from_value(json!({
        "title": "draft",
        "link": "https://www.jianshu.com/p/abc",
        "published_at": null
    }))
    .unwrap();
    assert!(transform(&a, 0, None, now()).is_none());
}

#[test]
fn unparseable_or_missing_timestamps_are_dropped_for_every_platform() {
    for raw in [None, Some(""), Some("   "), Some("3天前"), Some("2024-13-45T99:00:00Z")] {
        let raw = raw.map(str::to_string);
        let b = BilibiliVideo {
            url: Some("https://b/1".into()),
            published_at: raw.clone(),
            ..Default::default()
        };
        let y = YouTubeVideo {
            url: Some("https://y/1".into()),
            published_at: raw.clone(),
            ..Default::default()
        };
        let d = DoubanRssItem {
            url: Some("https://d/1".into()),
            published: raw.clone(),
            ..Default::default()
        };
        assert!(transform(&b, 0, None, now()).is_none(), "bilibili {raw:?}");
        assert!(transform(&y, 0, None, now()).is_none(), "youtube {raw:?}");
        assert!(transform(&d, 0, None, now()).is_none(), "douban {raw:?}");
    }
}

#[test]
fn valid_timestamps_round_trip_to_the_parsed_instant() {
    let cases = [
        ("2024-01-15T08:00:00Z", "2024-01-15T08:00:00Z"),
        ("2024-01-15T16:00:00+08:00", "2024-01-15T08:00:00Z"),
        ("2024-01-15T08:00:00.250Z", "2024-01-15T08:00:00.250Z"),
        ("2024-01-15 08:00:00", "2024-01-15T08:00:00Z"),
        ("2024-01-15T08:00:00", "2024-01-15T08:00:00Z"),
    ];
    for (raw, want) in cases {
        let a = JianshuArticle {
            link: Some("https://j/p/1".into()),
            published_at: Some(raw.into()),
            ..Default::default()
        };
        let item = transform(&a, 0, None, now()).unwrap_or_else(|| panic!("{raw} should parse"));
        assert_eq!(item.published_at_iso(), want, "raw {raw}");
    }
}

#[test]
fn rfc822_variants_parse_for_douban() {
    for raw in [
        "Mon, 15 Jan 2024 08:00:00 GMT",
        "Mon, 15 Jan 2024 08:00:00 +0000",
        "Mon, 15 Jan 2024 16:00:00 +0800",
        "15 Jan 2024 08:00:00 GMT",
    ] {
        let d = DoubanRssItem {
            url: Some("https://book.douban.com/subject/1/".into()),
            published: Some(raw.into()),
            kind: Some("interest".into()),
            ..Default::default()
        };
        let item = transform(&d, 0, None, now()).unwrap_or_else(|| panic!("{raw} should parse"));
        assert_eq!(item.published_at_iso(), "2024-01-15T08:00:00Z", "raw {raw}");
        assert_eq!(item.platform, Platform::DoubanRss);
        assert_eq!(item.metadata.kind.as_deref(), Some("collection"));
    }
}

#[test]
fn missing_url_drops_even_with_valid_timestamp() {
    let y = YouTubeVideo {
        video_id: Some("abc".into()),
        published_at: Some("2024-01-15T08:00:00Z".into()),
        ..Default::default()
    };
    assert!(transform(&y, 0, None, now()).is_none());
}

#[test]
fn relative_label_is_computed_unless_stored() {
    let mut v = BilibiliVideo {
        url: Some("https://b/1".into()),
        published_at: Some("2024-01-18T00:00:00Z".into()),
        ..Default::default()
    };
    assert_eq!(transform(&v, 0, None, now()).unwrap().formatted_date, "2 days ago");

    v.formatted_date = Some("前天".into());
    assert_eq!(transform(&v, 0, None, now()).unwrap().formatted_date, "前天");
}

#[test]
fn fetched_at_falls_back_to_batch_then_now_for_youtube_only() {
    let y = YouTubeVideo {
        video_id: Some("abc".into()),
        url: Some("https://youtu.be/abc".into()),
        published_at: Some("2024-01-15T08:00:00Z".into()),
        ..Default::default()
    };
    let with_batch = transform(&y, 0, Some("2024-01-19T00:00:00Z"), now()).unwrap();
    assert_eq!(with_batch.source.fetched_at.as_deref(), Some("2024-01-19T00:00:00Z"));
    let stamped = transform(&y, 0, None, now()).unwrap();
    assert_eq!(stamped.source.fetched_at.as_deref(), Some("2024-01-20T00:00:00Z"));
    assert_eq!(stamped.source.original_id.as_deref(), Some("abc"));

    let b = BilibiliVideo {
        url: Some("https://b/1".into()),
        published_at: Some("2024-01-15T08:00:00Z".into()),
        ..Default::default()
    };
    assert_eq!(transform(&b, 0, None, now()).unwrap().source.fetched_at, None);
}

#[test]
fn positional_ids_move_but_stable_ids_do_not() {
    let a = JianshuArticle {
        link: Some("https://j/p/a".into()),
        published_at: Some("2024-01-15T08:00:00Z".into()),
        ..Default::default()
    };
    let b = JianshuArticle {
        link: Some("https://j/p/b".into()),
        published_at: Some("2024-01-14T08:00:00Z".into()),
        ..Default::default()
    };

    let (first, dropped) = transform_batch(&[a.clone(), b.clone()], None, now());
    let (second, _) = transform_batch(&[b, a], None, now());
    assert_eq!(dropped, 0);

    assert_eq!(first[0].id, "jianshu-0");
    assert_eq!(second[1].id, "jianshu-1");
    assert_eq!(first[0].source.stable_id, second[1].source.stable_id);
    assert_eq!(
        first[0].source.stable_id.as_deref(),
        Some(stable_id(Platform::Jianshu, "a").as_str())
    );
}

#[test]
fn batch_indices_count_dropped_records() {
    let records = vec![
        BilibiliVideo {
            url: Some("https://b/0".into()),
            published_at: Some("2024-01-15T08:00:00Z".into()),
            ..Default::default()
        },
        BilibiliVideo {
            url: Some("https://b/1".into()),
            ..Default::default()
        },
        BilibiliVideo {
            url: Some("https://b/2".into()),
            published_at: Some("2024-01-13T08:00:00Z".into()),
            ..Default::default()
        },
    ];
    let (items, dropped) = transform_batch(&records, None, now());
    assert_eq!(dropped, 1);
    let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["bilibili-0", "bilibili-2"]);
}
