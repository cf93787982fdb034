use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

use crate::error::TrackerError;
use crate::tracker::{
    NewStory, OwnerBackfill, PointScale, ProjectInfo, Story, StoryType, StoryUpdate, TrackerClient,
};
use crate::workflow::{
    filter_done, filter_in_progress, filter_open, filter_owner, join_filters, Filter,
    WorkflowState,
};

/// Everything a token can reach, plus how queries against it behave
pub struct Account {
    client: TrackerClient,
    backfill: Box<dyn OwnerBackfill>,
    workflow_exit: WorkflowState,
}

impl Account {
    pub fn new(
        client: TrackerClient,
        backfill: Box<dyn OwnerBackfill>,
        workflow_exit: WorkflowState,
    ) -> Self {
        Account {
            client,
            backfill,
            workflow_exit,
        }
    }

    pub fn client(&self) -> &TrackerClient {
        &self.client
    }

    /// List every project for the current user
    pub fn projects(&self) -> Result<Vec<ProjectInfo>> {
        self.client.projects().context("Failed to list projects")
    }

    pub fn project(&self, info: ProjectInfo) -> Project<'_> {
        Project {
            account: self,
            info,
        }
    }

    /// Look for a story in each project in turn.
    ///
    /// A project the tracker answers with 404 is treated as not holding the
    /// story; any other failure ends the scan.
    pub fn find_story(
        &self,
        story_id: u64,
        projects: &[ProjectInfo],
    ) -> Result<Option<(Project<'_>, Story)>> {
        for info in projects {
            let project = self.project(info.clone());
            match project.load_story(story_id) {
                Ok(Some(story)) => return Ok(Some((project, story))),
                Ok(None) => {}
                Err(e) if is_not_found(&e) => {
                    warn!("Skipping project {} ({}): {:#}", project.name(), project.id(), e);
                }
                Err(e) => return Err(e),
            }
        }

        debug!("No project found for story #{}", story_id);
        Ok(None)
    }
}

/// A single project and the story queries it supports
pub struct Project<'a> {
    account: &'a Account,
    info: ProjectInfo,
}

impl std::fmt::Debug for Project<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl<'a> Project<'a> {
    pub fn id(&self) -> u64 {
        self.info.id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn point_scale(&self) -> &PointScale {
        &self.info.point_scale
    }

    pub fn workflow_exit(&self) -> WorkflowState {
        self.account.workflow_exit
    }

    /// Stories matching every filter term, with owners filled in.
    /// No match is an empty list, not an error.
    pub fn stories(&self, filters: &[Filter]) -> Result<Vec<Story>> {
        if filters.iter().any(Filter::matches_nothing) {
            debug!("Filter matches no workflow state, skipping search");
            return Ok(Vec::new());
        }

        let filter = join_filters(filters);
        debug!("Searching project {} for '{}'", self.info.id, filter);

        let mut stories = self
            .account
            .client
            .search_stories(self.info.id, &filter)
            .with_context(|| format!("Failed to search stories in {}", self.info.name))?;

        let repaired = self
            .account
            .backfill
            .backfill(&self.account.client, self.info.id, &mut stories)
            .context("Failed to fetch story owners")?;
        if repaired > 0 {
            info!("Filled in owners for {} stories", repaired);
        }

        Ok(stories)
    }

    /// A single story by id, if it lives in this project
    pub fn load_story(&self, story_id: u64) -> Result<Option<Story>> {
        Ok(self.stories(&[Filter::Id(story_id)])?.into_iter().next())
    }

    pub fn open_stories(&self, owner: Option<&str>) -> Result<Vec<Story>> {
        self.stories(&[filter_open(self.workflow_exit()), filter_owner(owner)])
    }

    /// Features somewhere between rejected and the exit state
    pub fn in_progress_stories(&self) -> Result<Vec<Story>> {
        self.stories(&[
            Filter::Type(StoryType::Feature),
            filter_in_progress(self.workflow_exit()),
        ])
    }

    pub fn finished_stories(&self) -> Result<Vec<Story>> {
        self.stories(&[
            Filter::Type(StoryType::Feature),
            filter_done(self.workflow_exit()),
        ])
    }

    pub fn open_bugs(&self) -> Result<Vec<Story>> {
        self.stories(&[Filter::Type(StoryType::Bug), filter_open(self.workflow_exit())])
    }

    pub fn finished_bugs(&self) -> Result<Vec<Story>> {
        self.stories(&[Filter::Type(StoryType::Bug), filter_done(self.workflow_exit())])
    }

    /// Open bugs, then unstarted features still waiting for points
    pub fn unestimated_stories(&self) -> Result<Vec<Story>> {
        let mut stories = self.open_bugs()?;
        let features = self.stories(&[
            Filter::Type(StoryType::Feature),
            Filter::State {
                states: vec![WorkflowState::Unstarted],
                include_done: false,
            },
        ])?;

        stories.extend(features.into_iter().filter(|story| !story.is_estimated()));
        Ok(stories)
    }

    pub fn create_story(&self, story: &NewStory) -> Result<()> {
        info!("Creating {} '{}' in {}", story.story_type, story.name, self.info.name);
        self.account
            .client
            .create_story(self.info.id, story)
            .context("Failed to create story")
    }

    /// Move a story to another workflow state
    pub fn transition(&self, story_id: u64, state: WorkflowState) -> Result<()> {
        info!("Moving story #{} to {}", story_id, state);
        self.account
            .client
            .update_story(self.info.id, story_id, StoryUpdate::State(state))
            .with_context(|| format!("Failed to mark story #{} {}", story_id, state))
    }

    pub fn assign_estimate(&self, story_id: u64, points: i32) -> Result<()> {
        info!("Estimating story #{} at {} points", story_id, points);
        self.account
            .client
            .update_story(self.info.id, story_id, StoryUpdate::Estimate(points))
            .with_context(|| format!("Failed to estimate story #{}", story_id))
    }
}

/// Pick the active project: the only one, the one at a 1-based index, or
/// whichever the user chooses at the prompt
pub fn select_project<R: BufRead, W: Write>(
    projects: &[ProjectInfo],
    index: Option<usize>,
    input: &mut R,
    output: &mut W,
) -> Result<ProjectInfo> {
    match projects {
        [] => return Err(TrackerError::NotFound("any project for this token".to_string()).into()),
        [only] => return Ok(only.clone()),
        _ => {}
    }

    if let Some(index) = index {
        return Ok(project_at(projects, index)?.clone());
    }

    loop {
        writeln!(output, "Select a Project:")?;
        for (idx, project) in projects.iter().enumerate() {
            writeln!(output, "[{}] {}", idx + 1, project.name)?;
        }
        write!(output, ">> ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(TrackerError::Configuration("no project selected".to_string()).into());
        }

        match line.trim().parse::<usize>().ok().and_then(|i| projects.get(i.wrapping_sub(1))) {
            Some(project) => return Ok(project.clone()),
            None => writeln!(output, "Hmmm, that did not work -- try again?")?,
        }
    }
}

/// Projects to search for a story: just the indexed one, or all of them
pub fn lookup_scope(projects: &[ProjectInfo], index: Option<usize>) -> Result<Vec<ProjectInfo>> {
    match index {
        Some(index) => Ok(vec![project_at(projects, index)?.clone()]),
        None => Ok(projects.to_vec()),
    }
}

fn is_not_found(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<TrackerError>(), Some(TrackerError::NotFound(_))))
}

fn project_at(projects: &[ProjectInfo], index: usize) -> Result<&ProjectInfo, TrackerError> {
    index
        .checked_sub(1)
        .and_then(|i| projects.get(i))
        .ok_or_else(|| {
            TrackerError::Configuration(format!(
                "project index {} is out of range (1-{})",
                index,
                projects.len()
            ))
        })
}
