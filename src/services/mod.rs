pub mod composer;
pub mod feed;
pub mod filter;
pub mod metrics;
