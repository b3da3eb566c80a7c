//! Service layer for the search agent.
//!
//! This module contains the external collaborators of a run:
//! - Search (`SearchProvider`, implemented by `SerpApiSearcher`)
//! - Mail delivery (`MailTransport`, implemented by `SmtpMailer`)

mod mail;
mod search;

pub use mail::{MailTransport, OutgoingMail, SmtpMailer};
pub use search::{
    RESULT_COUNT, SEARCH_LOCATION, SearchProvider, SerpApiSearcher, parse_response,
};
