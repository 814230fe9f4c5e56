pub mod feed;
pub mod model;

pub use feed::{SleeperFeed, SleeperFeedConfig};
pub use model::SleeperPlayer;
