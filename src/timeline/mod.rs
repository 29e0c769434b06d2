//! Timeline normalization pipeline: source records → `TimelineItem` → one
//! sorted feed.

pub mod group;
pub mod item;
pub mod merge;
pub mod parse;
pub mod relative;
pub mod sources;
pub mod transform;

pub use group::{group_by_date, DateGroup};
pub use item::{Metadata, Platform, PlatformInfo, SourceInfo, TimelineItem};
pub use merge::{merge_and_sort, merge_batches};
pub use relative::format_relative_time;
pub use sources::{BilibiliVideo, DoubanRssItem, JianshuArticle, SourceRecord, YouTubeVideo};
pub use transform::{transform, transform_batch};
