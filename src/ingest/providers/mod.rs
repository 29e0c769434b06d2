pub mod douban_rss;
pub mod dump;

pub use douban_rss::DoubanRssProvider;
pub use dump::DumpProvider;
