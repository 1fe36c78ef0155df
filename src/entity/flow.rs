// src/entity/flow.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{copy_title, require, Category, Lifecycle, Record, RecordBase};
use crate::gateway::ValidationError;
use crate::stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Archived,
}

impl std::fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowStatus::Draft => write!(f, "draft"),
            FlowStatus::Active => write!(f, "active"),
            FlowStatus::Paused => write!(f, "paused"),
            FlowStatus::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for FlowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(FlowStatus::Draft),
            "active" => Ok(FlowStatus::Active),
            "paused" => Ok(FlowStatus::Paused),
            "archived" => Ok(FlowStatus::Archived),
            _ => Err(format!("Invalid flow status: {}", s)),
        }
    }
}

impl Lifecycle for FlowStatus {
    const ALL: &'static [Self] = &[
        FlowStatus::Draft,
        FlowStatus::Active,
        FlowStatus::Paused,
        FlowStatus::Archived,
    ];

    fn can_transition_to(self, next: Self) -> bool {
        use FlowStatus::*;
        matches!(
            (self, next),
            (Draft, Active)
                | (Draft, Archived)
                | (Active, Paused)
                | (Active, Archived)
                | (Paused, Active)
                | (Paused, Archived)
                | (Archived, Draft)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    #[default]
    Onboarding,
    FeatureAdoption,
    Announcement,
    Survey,
    Checklist,
}

impl std::fmt::Display for FlowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowType::Onboarding => write!(f, "onboarding"),
            FlowType::FeatureAdoption => write!(f, "feature_adoption"),
            FlowType::Announcement => write!(f, "announcement"),
            FlowType::Survey => write!(f, "survey"),
            FlowType::Checklist => write!(f, "checklist"),
        }
    }
}

impl std::str::FromStr for FlowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "onboarding" => Ok(FlowType::Onboarding),
            "feature_adoption" => Ok(FlowType::FeatureAdoption),
            "announcement" => Ok(FlowType::Announcement),
            "survey" => Ok(FlowType::Survey),
            "checklist" => Ok(FlowType::Checklist),
            _ => Err(format!("Invalid flow type: {}", s)),
        }
    }
}

impl Category for FlowType {
    const ALL: &'static [Self] = &[
        FlowType::Onboarding,
        FlowType::FeatureAdoption,
        FlowType::Announcement,
        FlowType::Survey,
        FlowType::Checklist,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Modal,
    Tooltip,
    Hotspot,
    Slideout,
    Checklist,
    Banner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStep {
    pub id: Uuid,
    pub step_type: StepType,
    pub title: String,
    pub content: String,
    pub order: u32,
}

/// A guided onboarding or adoption flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    #[serde(flatten)]
    pub base: RecordBase,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub flow_type: FlowType,
    pub status: FlowStatus,
    #[serde(default)]
    pub steps: Vec<FlowStep>,
    pub segment_id: Option<String>,
    pub views: u32,
    pub completions: u32,
    pub dropoff_rate: f64,
    /// Mean time to complete, in seconds.
    pub avg_time_to_complete: f64,
}

impl Flow {
    pub fn new(name: String) -> Self {
        Self {
            base: RecordBase::draft(),
            name,
            description: String::new(),
            flow_type: FlowType::default(),
            status: FlowStatus::default(),
            steps: Vec::new(),
            segment_id: None,
            views: 0,
            completions: 0,
            dropoff_rate: 0.0,
            avg_time_to_complete: 0.0,
        }
    }

    pub fn completion_rate(&self) -> f64 {
        stats::rate(self.completions as f64, self.views as f64)
    }
}

impl Record for Flow {
    type Status = FlowStatus;
    type Category = FlowType;

    const COLLECTION: &'static str = "onboarding_flows";
    const NOUN: &'static str = "flow";

    fn base(&self) -> &RecordBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RecordBase {
        &mut self.base
    }

    fn status(&self) -> FlowStatus {
        self.status
    }

    fn set_status(&mut self, status: FlowStatus) {
        self.status = status;
    }

    fn category(&self) -> FlowType {
        self.flow_type
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn searchable_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.description.as_str()]
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)
    }

    fn duplicate(&self) -> Self {
        Self {
            base: self.base.duplicate(),
            name: copy_title(&self.name),
            description: self.description.clone(),
            flow_type: self.flow_type,
            steps: self.steps.clone(),
            segment_id: self.segment_id.clone(),
            ..Flow::new(String::new())
        }
    }

    fn fixtures() -> Vec<Self> {
        let mut welcome = Flow::new("Welcome Tour".to_string());
        welcome.base = RecordBase::fixture("flow/welcome", 4);
        welcome.description = "Introduce new users to the dashboard".to_string();
        welcome.status = FlowStatus::Active;
        welcome.views = 4200;
        welcome.completions = 3150;
        welcome.dropoff_rate = 25.0;

        let mut adoption = Flow::new("Reports Feature Adoption".to_string());
        adoption.base = RecordBase::fixture("flow/adoption", 12);
        adoption.flow_type = FlowType::FeatureAdoption;
        adoption.status = FlowStatus::Paused;
        adoption.views = 900;
        adoption.completions = 310;

        vec![welcome, adoption]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub completed: bool,
    pub order: u32,
    pub action_url: Option<String>,
    pub is_required: bool,
}

/// An onboarding checklist. Shares the flow lifecycle; its category is
/// always [`FlowType::Checklist`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    #[serde(flatten)]
    pub base: RecordBase,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: FlowStatus,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
    pub segment_id: Option<String>,
    pub users_started: u32,
    pub users_completed: u32,
}

impl Checklist {
    pub fn new(name: String) -> Self {
        Self {
            base: RecordBase::draft(),
            name,
            description: String::new(),
            status: FlowStatus::default(),
            items: Vec::new(),
            segment_id: None,
            users_started: 0,
            users_completed: 0,
        }
    }

    pub fn completion_rate(&self) -> f64 {
        stats::rate(self.users_completed as f64, self.users_started as f64)
    }

    /// Percent of items ticked off.
    pub fn progress(&self) -> f64 {
        let done = self.items.iter().filter(|i| i.completed).count();
        stats::rate(done as f64, self.items.len() as f64)
    }
}

impl Record for Checklist {
    type Status = FlowStatus;
    type Category = FlowType;

    const COLLECTION: &'static str = "onboarding_checklists";
    const NOUN: &'static str = "checklist";

    fn base(&self) -> &RecordBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RecordBase {
        &mut self.base
    }

    fn status(&self) -> FlowStatus {
        self.status
    }

    fn set_status(&mut self, status: FlowStatus) {
        self.status = status;
    }

    fn category(&self) -> FlowType {
        FlowType::Checklist
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn searchable_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = vec![self.name.as_str(), self.description.as_str()];
        fields.extend(self.items.iter().map(|i| i.title.as_str()));
        fields
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        for item in &self.items {
            require("items.title", &item.title)?;
        }
        Ok(())
    }

    fn duplicate(&self) -> Self {
        let items = self
            .items
            .iter()
            .map(|item| ChecklistItem {
                id: Uuid::new_v4(),
                completed: false,
                ..item.clone()
            })
            .collect();
        Self {
            base: self.base.duplicate(),
            name: copy_title(&self.name),
            description: self.description.clone(),
            items,
            segment_id: self.segment_id.clone(),
            ..Checklist::new(String::new())
        }
    }
}
