pub mod hub;
pub mod resolver;

pub use hub::{BroadcastHub, FeedMessage, Subscriber};
pub use resolver::{build_feed_message, run_rank_resolver};
