pub mod feed;
pub mod pipeline;

pub use feed::PriceFeed;
pub use pipeline::{compute_market_cap, MarketCapPipeline, PipelineState};
