use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;

use crate::error::TrackerError;

mod backfill;
mod client;
mod models;

pub use backfill::*;
pub use client::*;
pub use models::*;

/// Environment variable holding the API token
pub const TOKEN_ENV: &str = "PIVOTAL_TOKEN";

/// Pivotal Tracker REST API v5
pub const DEFAULT_API_URL: &str = "https://www.pivotaltracker.com/services/v5";

/// Fields requested on every story search
pub const STORY_FIELDS: &str = "owners,comments(person,file_attachments,:default),tasks,:default";

/// Unreserved characters stay literal; everything else is escaped, space included
const FILTER_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a joined search filter for the `filter` query parameter
pub fn encode_filter(filter: &str) -> String {
    utf8_percent_encode(filter, FILTER_ENCODE_SET).to_string()
}

/// The API token sent as `X-TrackerToken` on every request
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Result<Self, TrackerError> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(TrackerError::MissingToken);
        }
        Ok(ApiToken(token))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(****)")
    }
}
