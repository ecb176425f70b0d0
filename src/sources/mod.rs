pub mod barchart_client;
pub mod barchart_stories;
pub mod traits;

pub use barchart_client::BarchartClient;
pub use barchart_stories::BarchartStoryParser;
pub use traits::{Credential, PageFetcher, PageParser, PagePayload, SessionProvider};
