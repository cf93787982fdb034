use anyhow::{Context, Result};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::tracker::models::*;
use crate::tracker::{encode_filter, ApiToken, STORY_FIELDS};

/// Tracker client abstraction
pub enum TrackerClient {
    Real(RealTracker),
    #[cfg(test)]
    Mock(MockTracker),
}

impl TrackerClient {
    /// Create a new real tracker client
    pub fn new(token: ApiToken, config: &TrackerConfig) -> Result<Self> {
        Ok(TrackerClient::Real(RealTracker::new(token, config)?))
    }

    /// Create a mock client for testing
    #[cfg(test)]
    pub fn mock() -> Self {
        TrackerClient::Mock(MockTracker::new())
    }

    /// List every project the token can see
    pub fn projects(&self) -> Result<Vec<ProjectInfo>> {
        match self {
            TrackerClient::Real(client) => client.projects(),
            #[cfg(test)]
            TrackerClient::Mock(client) => client.projects(),
        }
    }

    /// Run a story search with an already-joined filter string
    pub fn search_stories(&self, project_id: u64, filter: &str) -> Result<Vec<Story>> {
        match self {
            TrackerClient::Real(client) => client.search_stories(project_id, filter),
            #[cfg(test)]
            TrackerClient::Mock(client) => client.search_stories(project_id, filter),
        }
    }

    /// Fetch the owners of one story
    pub fn story_owners(&self, project_id: u64, story_id: u64) -> Result<Vec<Person>> {
        match self {
            TrackerClient::Real(client) => client.story_owners(project_id, story_id),
            #[cfg(test)]
            TrackerClient::Mock(client) => client.story_owners(project_id, story_id),
        }
    }

    /// Create a story in a project
    pub fn create_story(&self, project_id: u64, story: &NewStory) -> Result<()> {
        match self {
            TrackerClient::Real(client) => client.create_story(project_id, story),
            #[cfg(test)]
            TrackerClient::Mock(client) => client.create_story(project_id, story),
        }
    }

    /// Apply a single-field update to a story
    pub fn update_story(&self, project_id: u64, story_id: u64, update: StoryUpdate) -> Result<()> {
        match self {
            TrackerClient::Real(client) => client.update_story(project_id, story_id, update),
            #[cfg(test)]
            TrackerClient::Mock(client) => client.update_story(project_id, story_id, update),
        }
    }
}

/// Real tracker client talking to the REST API
pub struct RealTracker {
    http: HttpClient,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl RealTracker {
    /// Create a new real tracker client
    pub fn new(token: ApiToken, config: &TrackerConfig) -> Result<Self> {
        let mut token_header = HeaderValue::from_str(token.expose()).map_err(|_| {
            TrackerError::Configuration("API token contains invalid characters".to_string())
        })?;
        token_header.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("X-TrackerToken", token_header);

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(RealTracker {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    pub fn projects(&self) -> Result<Vec<ProjectInfo>> {
        self.get("/projects")
    }

    pub fn search_stories(&self, project_id: u64, filter: &str) -> Result<Vec<Story>> {
        let path = format!(
            "/projects/{}/stories?fields={}&filter={}",
            project_id,
            STORY_FIELDS,
            encode_filter(filter)
        );
        self.get(&path)
    }

    pub fn story_owners(&self, project_id: u64, story_id: u64) -> Result<Vec<Person>> {
        let path = format!("/projects/{}/stories/{}/owners", project_id, story_id);
        self.get(&path)
    }

    pub fn create_story(&self, project_id: u64, story: &NewStory) -> Result<()> {
        let path = format!("/projects/{}/stories", project_id);
        let body = story.to_xml().context("Failed to serialize story")?;
        debug!("POST {} {}", path, body);

        let response = self
            .http
            .post(self.url(&path))
            .header(CONTENT_TYPE, "application/xml")
            .body(body)
            .send()
            .map_err(transport_error)?;

        read_response(response, &path)?;
        Ok(())
    }

    pub fn update_story(&self, project_id: u64, story_id: u64, update: StoryUpdate) -> Result<()> {
        let path = format!("/projects/{}/stories/{}", project_id, story_id);
        let (key, value) = update.query_pair();
        debug!("PUT {}?{}={}", path, key, value);

        let response = self
            .http
            .put(self.url(&path))
            .query(&[(key, value)])
            .header(CONTENT_LENGTH, HeaderValue::from_static("0"))
            .send()
            .map_err(transport_error)?;

        read_response(response, &path)?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET and decode JSON, retrying transient failures
    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);

        let body = retry_idempotent(self.max_retries, self.retry_delay, path, || {
            debug!("GET {}", url);
            let response = self.http.get(&url).send().map_err(transport_error)?;
            read_response(response, path)
        })?;

        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse tracker response from {}", path))
    }
}

/// Run an idempotent request, retrying with exponential backoff while the
/// failure is transient
pub(crate) fn retry_idempotent<T>(
    max_retries: u32,
    base_delay: Duration,
    what: &str,
    mut request: impl FnMut() -> Result<T, TrackerError>,
) -> Result<T, TrackerError> {
    let mut attempts = 0;

    loop {
        match request() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempts < max_retries => {
                attempts += 1;
                let delay = backoff_delay(base_delay, attempts);
                warn!(
                    "{} failed ({}), retry {}/{} in {:?}",
                    what, e, attempts, max_retries, delay
                );
                std::thread::sleep(delay);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Longest pause between two attempts
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Exponential backoff: base, 2x base, 4x base, ... capped at `MAX_RETRY_DELAY`
fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
    base_delay.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

fn transport_error(error: reqwest::Error) -> TrackerError {
    TrackerError::Unreachable(error.to_string())
}

fn read_response(response: Response, path: &str) -> Result<String, TrackerError> {
    let status = response.status();
    let body = response.text().map_err(transport_error)?;
    debug!("{} -> {}: {}", path, status, body);

    if status.is_success() {
        Ok(body)
    } else if status == StatusCode::NOT_FOUND {
        Err(TrackerError::NotFound(path.to_string()))
    } else {
        Err(TrackerError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Mock tracker client for testing
#[cfg(test)]
#[derive(Default)]
pub struct MockTracker {
    pub projects: Vec<ProjectInfo>,
    pub stories: Vec<Story>,
    pub owners: std::collections::HashMap<u64, Vec<Person>>,
    pub owner_delays: std::collections::HashMap<u64, Duration>,
    pub failing_owner_fetches: std::collections::HashSet<u64>,
    /// Projects whose searches answer 404
    pub missing_projects: std::collections::HashSet<u64>,
    /// Projects whose searches answer 500
    pub failing_projects: std::collections::HashSet<u64>,
    pub searches: std::sync::Mutex<Vec<String>>,
    pub owner_fetches: std::sync::Mutex<Vec<u64>>,
    pub updates: std::sync::Mutex<Vec<(u64, StoryUpdate)>>,
    pub created: std::sync::Mutex<Vec<(u64, NewStory)>>,
}

#[cfg(test)]
impl MockTracker {
    pub fn new() -> Self {
        MockTracker::default()
    }

    pub fn projects(&self) -> Result<Vec<ProjectInfo>> {
        Ok(self.projects.clone())
    }

    pub fn search_stories(&self, project_id: u64, filter: &str) -> Result<Vec<Story>> {
        self.searches.lock().unwrap().push(filter.to_string());

        if self.missing_projects.contains(&project_id) {
            return Err(TrackerError::NotFound(format!("/projects/{}/stories", project_id)).into());
        }
        if self.failing_projects.contains(&project_id) {
            return Err(TrackerError::Rejected {
                status: 500,
                body: format!("project {} unavailable", project_id),
            }
            .into());
        }

        Ok(self
            .stories
            .iter()
            .filter(|story| story.project_id.map_or(true, |id| id == project_id))
            .filter(|story| mock_matches(story, filter))
            .cloned()
            .collect())
    }

    pub fn story_owners(&self, _project_id: u64, story_id: u64) -> Result<Vec<Person>> {
        self.owner_fetches.lock().unwrap().push(story_id);

        if let Some(delay) = self.owner_delays.get(&story_id) {
            std::thread::sleep(*delay);
        }
        if self.failing_owner_fetches.contains(&story_id) {
            return Err(TrackerError::Rejected {
                status: 500,
                body: format!("owners of #{} unavailable", story_id),
            }
            .into());
        }

        Ok(self.owners.get(&story_id).cloned().unwrap_or_default())
    }

    pub fn create_story(&self, project_id: u64, story: &NewStory) -> Result<()> {
        self.created.lock().unwrap().push((project_id, story.clone()));
        Ok(())
    }

    pub fn update_story(&self, _project_id: u64, story_id: u64, update: StoryUpdate) -> Result<()> {
        self.updates.lock().unwrap().push((story_id, update));
        Ok(())
    }
}

/// Evaluate the subset of the search grammar the mock understands
#[cfg(test)]
fn mock_matches(story: &Story, filter: &str) -> bool {
    filter
        .split_whitespace()
        .all(|term| match term.split_once(':') {
            Some(("type", kind)) => story.story_type.as_str() == kind,
            Some(("state", states)) => states
                .split(',')
                .any(|state| state == story.current_state.as_str()),
            Some(("owner", owner)) => story
                .owners
                .iter()
                .any(|p| p.initials == owner || p.name == owner),
            Some(("id", id)) => story.id.to_string() == id,
            _ => true,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::WorkflowState;
    use std::cell::Cell;

    #[test]
    fn test_retry_recovers_from_transient_failures() {
        let calls = Cell::new(0);
        let result = retry_idempotent(3, Duration::ZERO, "GET /projects", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(TrackerError::Unreachable("connection refused".to_string()))
            } else {
                Ok("[]")
            }
        });

        assert_eq!(result.unwrap(), "[]");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_retry_gives_up_after_max_retries() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_idempotent(2, Duration::ZERO, "GET /projects", || {
            calls.set(calls.get() + 1);
            Err(TrackerError::Rejected {
                status: 502,
                body: "bad gateway".to_string(),
            })
        });

        assert!(matches!(result, Err(TrackerError::Rejected { status: 502, .. })));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_retry_survives_large_retry_counts() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_idempotent(40, Duration::ZERO, "GET /projects", || {
            calls.set(calls.get() + 1);
            Err(TrackerError::Unreachable("connection refused".to_string()))
        });

        assert!(matches!(result, Err(TrackerError::Unreachable(_))));
        assert_eq!(calls.get(), 41);
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        let base = Duration::from_millis(500);

        assert_eq!(backoff_delay(base, 1), base);
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 40), MAX_RETRY_DELAY);
        assert_eq!(backoff_delay(Duration::from_millis(u64::MAX), 2), MAX_RETRY_DELAY);
        assert_eq!(backoff_delay(Duration::ZERO, u32::MAX), Duration::ZERO);
    }

    #[test]
    fn test_retry_skips_client_errors() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_idempotent(5, Duration::ZERO, "GET /projects", || {
            calls.set(calls.get() + 1);
            Err(TrackerError::Rejected {
                status: 403,
                body: "forbidden".to_string(),
            })
        });

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_real_client_rejects_unprintable_token() {
        let token = ApiToken::new("abc\ndef").unwrap();
        let result = RealTracker::new(token, &TrackerConfig::default());

        assert!(result.is_err());
    }

    #[test]
    fn test_mock_filter_matching() {
        let mut mock = MockTracker::new();
        mock.stories.push(Story {
            id: 1,
            name: "started bug".to_string(),
            story_type: StoryType::Bug,
            current_state: WorkflowState::Started.into(),
            ..Default::default()
        });
        mock.stories.push(Story {
            id: 2,
            name: "accepted feature".to_string(),
            story_type: StoryType::Feature,
            current_state: WorkflowState::Accepted.into(),
            ..Default::default()
        });
        let client = TrackerClient::Mock(mock);

        let bugs = client.search_stories(1, "type:bug state:started,finished").unwrap();
        assert_eq!(bugs.len(), 1);
        assert_eq!(bugs[0].id, 1);

        let done = client
            .search_stories(1, "state:accepted includedone:true")
            .unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, 2);
    }
}
