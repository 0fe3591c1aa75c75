//! Listing-portal scraping.
//!
//! [`portal::Portal`] drives the search form, [`listing::PageScraper`] reads
//! one results page and [`paginator::Paginator`] walks the pages. Linked
//! documents are downloaded through [`http_client`].

pub mod browser;
pub mod http_client;
pub mod listing;
pub mod paginator;
pub mod portal;

pub use browser::{
    AutomationSession, ChromiumSessionFactory, ControlInfo, FixtureSessionFactory,
    HtmlFixtureSession, SessionError, SessionFactory,
};
pub use http_client::{DocumentFetcher, FetchError, HeadResponse, HttpClient};
pub use listing::PageScraper;
pub use paginator::Paginator;
pub use portal::Portal;
