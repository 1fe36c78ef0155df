//! Per-collection glue between CLI arguments and records.

use crate::entity::{Channel, Checklist, Flow, Record, Survey, SurveyResponse, TeamMember, TestSpec};
use crate::error::{DashviewError, Result};

/// Fields accepted by `dashview add`.
#[derive(Debug, Default, Clone)]
pub struct DraftFields {
    pub title: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub file: Option<String>,
}

/// A record the CLI can create, edit and print.
pub trait CliRecord: Record {
    const PLURAL: &'static str;
    /// Whether `--description` means anything for this record.
    const DESCRIBED: bool = true;

    /// Creation payload from `add` arguments.
    fn draft(fields: DraftFields) -> Result<Self>;

    fn set_label(&mut self, label: String);

    fn set_description(&mut self, description: String);

    fn set_category(&mut self, category: Self::Category);

    /// Extra text shown after the label in list output.
    fn columns(&self) -> String {
        String::new()
    }

    /// Extra `(field, value)` lines shown by `get`.
    fn details(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Reject `--description` for records that have none.
pub fn check_described<R: CliRecord>(description: Option<&String>) -> Result<()> {
    if description.is_some() && !R::DESCRIBED {
        return Err(DashviewError::InvalidArgument(format!(
            "A {} has no description",
            R::NOUN
        )));
    }
    Ok(())
}

fn apply_description<R: CliRecord>(record: &mut R, description: Option<String>) -> Result<()> {
    check_described::<R>(description.as_ref())?;
    if let Some(text) = description {
        record.set_description(text);
    }
    Ok(())
}

impl CliRecord for Survey {
    const PLURAL: &'static str = "surveys";

    fn draft(fields: DraftFields) -> Result<Self> {
        let mut survey = Survey::new(fields.title);
        apply_description(&mut survey, fields.description)?;
        Ok(survey)
    }

    fn set_label(&mut self, label: String) {
        self.title = label;
    }

    fn set_description(&mut self, description: String) {
        self.description = description;
    }

    fn set_category(&mut self, category: Self::Category) {
        self.survey_type = category;
    }

    fn columns(&self) -> String {
        format!(
            " - {} responses, {:.1}% completed",
            self.total_responses,
            self.completion_rate()
        )
    }

    fn details(&self) -> Vec<(&'static str, String)> {
        let mut lines = vec![
            ("Questions", self.questions.len().to_string()),
            ("Responses", self.total_responses.to_string()),
            ("Completion", format!("{:.1}%", self.completion_rate())),
        ];
        if let Some(at) = self.published_at {
            lines.push(("Published", at.format("%Y-%m-%d %H:%M").to_string()));
        }
        if let Some(at) = self.closed_at {
            lines.push(("Closed", at.format("%Y-%m-%d %H:%M").to_string()));
        }
        lines
    }
}

impl CliRecord for SurveyResponse {
    const PLURAL: &'static str = "responses";
    const DESCRIBED: bool = false;

    fn draft(_fields: DraftFields) -> Result<Self> {
        Err(DashviewError::InvalidArgument(
            "Use 'dashview respond <survey-id>' to record a response".to_string(),
        ))
    }

    fn set_label(&mut self, label: String) {
        self.respondent_email = Some(label);
    }

    fn set_description(&mut self, _description: String) {}

    fn set_category(&mut self, category: Self::Category) {
        self.channel = category;
    }

    fn columns(&self) -> String {
        match self.nps_score {
            Some(score) => format!(" - score {}", score),
            None => String::new(),
        }
    }

    fn details(&self) -> Vec<(&'static str, String)> {
        let mut lines = vec![("Survey", self.survey_id.to_string())];
        if let Some(score) = self.nps_score {
            lines.push(("Score", score.to_string()));
        }
        lines
    }
}

impl CliRecord for Flow {
    const PLURAL: &'static str = "flows";

    fn draft(fields: DraftFields) -> Result<Self> {
        let mut flow = Flow::new(fields.title);
        apply_description(&mut flow, fields.description)?;
        Ok(flow)
    }

    fn set_label(&mut self, label: String) {
        self.name = label;
    }

    fn set_description(&mut self, description: String) {
        self.description = description;
    }

    fn set_category(&mut self, category: Self::Category) {
        self.flow_type = category;
    }

    fn columns(&self) -> String {
        format!(" - {} views, {:.1}% completed", self.views, self.completion_rate())
    }

    fn details(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Steps", self.steps.len().to_string()),
            ("Views", self.views.to_string()),
            ("Completions", self.completions.to_string()),
        ]
    }
}

impl CliRecord for Checklist {
    const PLURAL: &'static str = "checklists";

    fn draft(fields: DraftFields) -> Result<Self> {
        let mut checklist = Checklist::new(fields.title);
        apply_description(&mut checklist, fields.description)?;
        Ok(checklist)
    }

    fn set_label(&mut self, label: String) {
        self.name = label;
    }

    fn set_description(&mut self, description: String) {
        self.description = description;
    }

    // Checklists are always of the checklist flow type.
    fn set_category(&mut self, _category: Self::Category) {}

    fn columns(&self) -> String {
        format!(" - {} items, {:.1}% completed", self.items.len(), self.completion_rate())
    }
}

impl CliRecord for TeamMember {
    const PLURAL: &'static str = "team members";

    fn draft(fields: DraftFields) -> Result<Self> {
        let mut member = TeamMember::new(fields.title, fields.email.unwrap_or_default());
        apply_description(&mut member, fields.description)?;
        Ok(member)
    }

    fn set_label(&mut self, label: String) {
        self.name = label;
    }

    fn set_description(&mut self, description: String) {
        self.job_title = description;
    }

    fn set_category(&mut self, category: Self::Category) {
        self.role = category;
    }

    fn columns(&self) -> String {
        format!(" <{}>", self.email)
    }

    fn details(&self) -> Vec<(&'static str, String)> {
        let mut lines = vec![("Email", self.email.clone())];
        if !self.job_title.is_empty() {
            lines.push(("Job title", self.job_title.clone()));
        }
        if !self.department.is_empty() {
            lines.push(("Department", self.department.clone()));
        }
        lines
    }
}

impl CliRecord for Channel {
    const PLURAL: &'static str = "channels";

    fn draft(fields: DraftFields) -> Result<Self> {
        let mut channel = Channel::new(fields.title);
        apply_description(&mut channel, fields.description)?;
        Ok(channel)
    }

    fn set_label(&mut self, label: String) {
        self.name = label;
    }

    fn set_description(&mut self, description: String) {
        self.description = description;
    }

    fn set_category(&mut self, category: Self::Category) {
        self.channel_type = category;
    }

    fn columns(&self) -> String {
        if self.unread_count > 0 {
            format!(" - {} unread", self.unread_count)
        } else {
            String::new()
        }
    }
}

impl CliRecord for TestSpec {
    const PLURAL: &'static str = "tests";

    fn draft(fields: DraftFields) -> Result<Self> {
        let mut spec = TestSpec::new(fields.title, fields.file.unwrap_or_default());
        apply_description(&mut spec, fields.description)?;
        Ok(spec)
    }

    fn set_label(&mut self, label: String) {
        self.name = label;
    }

    // The suite name stands in for a description.
    fn set_description(&mut self, description: String) {
        self.suite = description;
    }

    fn set_category(&mut self, category: Self::Category) {
        self.test_type = category;
    }

    fn columns(&self) -> String {
        format!(" - {} ({}ms)", self.file, self.duration_ms)
    }

    fn details(&self) -> Vec<(&'static str, String)> {
        let mut lines = vec![("File", self.file.clone()), ("Browser", self.browser.to_string())];
        if let Some(ref error) = self.error {
            lines.push(("Error", error.clone()));
        }
        lines
    }
}
