use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;

/// What an open feed socket can report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Frame(String),
    Closed(Option<String>),
    Error(String),
}

/// One open connection to the feed.
#[async_trait]
pub trait FeedLink: Send {
    async fn send_text(&mut self, text: &str) -> Result<()>;

    /// Waits for the next inbound event. After `Closed` or `Error` the link
    /// is not polled again.
    async fn next_event(&mut self) -> LinkEvent;

    async fn close(&mut self);
}

/// Opens feed connections.
#[async_trait]
pub trait FeedConnector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn FeedLink>>;
}
