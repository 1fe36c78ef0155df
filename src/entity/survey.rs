// src/entity/survey.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{copy_title, require, Category, Lifecycle, Record, RecordBase};
use crate::gateway::ValidationError;
use crate::stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SurveyStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Closed,
}

impl std::fmt::Display for SurveyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurveyStatus::Draft => write!(f, "draft"),
            SurveyStatus::Active => write!(f, "active"),
            SurveyStatus::Paused => write!(f, "paused"),
            SurveyStatus::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for SurveyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(SurveyStatus::Draft),
            "active" => Ok(SurveyStatus::Active),
            "paused" => Ok(SurveyStatus::Paused),
            "closed" => Ok(SurveyStatus::Closed),
            _ => Err(format!("Invalid survey status: {}", s)),
        }
    }
}

impl Lifecycle for SurveyStatus {
    const ALL: &'static [Self] = &[
        SurveyStatus::Draft,
        SurveyStatus::Active,
        SurveyStatus::Paused,
        SurveyStatus::Closed,
    ];

    fn can_transition_to(self, next: Self) -> bool {
        use SurveyStatus::*;
        matches!(
            (self, next),
            (Draft, Active) | (Active, Paused) | (Active, Closed) | (Paused, Active) | (Paused, Closed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SurveyType {
    #[default]
    CustomerFeedback,
    Nps,
    Csat,
    EmployeeEngagement,
    MarketResearch,
    ProductFeedback,
    EventFeedback,
    Other,
}

impl std::fmt::Display for SurveyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurveyType::CustomerFeedback => write!(f, "customer-feedback"),
            SurveyType::Nps => write!(f, "nps"),
            SurveyType::Csat => write!(f, "csat"),
            SurveyType::EmployeeEngagement => write!(f, "employee-engagement"),
            SurveyType::MarketResearch => write!(f, "market-research"),
            SurveyType::ProductFeedback => write!(f, "product-feedback"),
            SurveyType::EventFeedback => write!(f, "event-feedback"),
            SurveyType::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for SurveyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "customer-feedback" => Ok(SurveyType::CustomerFeedback),
            "nps" => Ok(SurveyType::Nps),
            "csat" => Ok(SurveyType::Csat),
            "employee-engagement" => Ok(SurveyType::EmployeeEngagement),
            "market-research" => Ok(SurveyType::MarketResearch),
            "product-feedback" => Ok(SurveyType::ProductFeedback),
            "event-feedback" => Ok(SurveyType::EventFeedback),
            "other" => Ok(SurveyType::Other),
            _ => Err(format!("Invalid survey type: {}", s)),
        }
    }
}

impl Category for SurveyType {
    const ALL: &'static [Self] = &[
        SurveyType::CustomerFeedback,
        SurveyType::Nps,
        SurveyType::Csat,
        SurveyType::EmployeeEngagement,
        SurveyType::MarketResearch,
        SurveyType::ProductFeedback,
        SurveyType::EventFeedback,
        SurveyType::Other,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    ShortText,
    LongText,
    MultipleChoice,
    Checkbox,
    Rating,
    Nps,
    Date,
    FileUpload,
    Dropdown,
    LinearScale,
    Matrix,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub question_type: QuestionType,
    pub title: String,
    pub description: Option<String>,
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    #[serde(flatten)]
    pub base: RecordBase,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: SurveyStatus,
    pub survey_type: SurveyType,
    #[serde(default)]
    pub questions: Vec<Question>,
    pub total_responses: u32,
    pub completed_responses: u32,
    /// Mean completion time in seconds.
    pub average_time: f64,
    pub published_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Survey {
    pub fn new(title: String) -> Self {
        Self {
            base: RecordBase::draft(),
            title,
            description: String::new(),
            status: SurveyStatus::default(),
            survey_type: SurveyType::default(),
            questions: Vec::new(),
            total_responses: 0,
            completed_responses: 0,
            average_time: 0.0,
            published_at: None,
            closed_at: None,
        }
    }

    /// Share of started responses that were completed, in percent.
    pub fn completion_rate(&self) -> f64 {
        stats::rate(self.completed_responses as f64, self.total_responses as f64)
    }
}

impl Record for Survey {
    type Status = SurveyStatus;
    type Category = SurveyType;

    const COLLECTION: &'static str = "surveys";
    const NOUN: &'static str = "survey";
    const DEPENDENTS: &'static [&'static str] = &[SurveyResponse::COLLECTION];

    fn base(&self) -> &RecordBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RecordBase {
        &mut self.base
    }

    fn status(&self) -> SurveyStatus {
        self.status
    }

    fn set_status(&mut self, status: SurveyStatus) {
        let now = Utc::now();
        match status {
            SurveyStatus::Active if self.published_at.is_none() => self.published_at = Some(now),
            SurveyStatus::Closed => self.closed_at = Some(now),
            _ => {}
        }
        self.status = status;
    }

    fn category(&self) -> SurveyType {
        self.survey_type
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn searchable_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.description.as_str()]
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("title", &self.title)
    }

    fn duplicate(&self) -> Self {
        Self {
            base: self.base.duplicate(),
            title: copy_title(&self.title),
            description: self.description.clone(),
            survey_type: self.survey_type,
            questions: self.questions.clone(),
            ..Survey::new(String::new())
        }
    }

    fn fixtures() -> Vec<Self> {
        let mut satisfaction = Survey::new("Customer Satisfaction Survey 2024".to_string());
        satisfaction.base = RecordBase::fixture("survey/satisfaction", 2);
        satisfaction.description = "Quarterly pulse on product satisfaction".to_string();
        satisfaction.status = SurveyStatus::Active;
        satisfaction.survey_type = SurveyType::Csat;
        satisfaction.total_responses = 1250;
        satisfaction.completed_responses = 1088;
        satisfaction.average_time = 245.0;

        let mut nps = Survey::new("Product NPS Tracker".to_string());
        nps.base = RecordBase::fixture("survey/nps", 9);
        nps.description = "Net promoter score for the main product".to_string();
        nps.status = SurveyStatus::Paused;
        nps.survey_type = SurveyType::Nps;
        nps.total_responses = 430;
        nps.completed_responses = 412;
        nps.average_time = 60.0;

        let mut onboarding = Survey::new("Employee Onboarding Feedback".to_string());
        onboarding.base = RecordBase::fixture("survey/onboarding", 20);
        onboarding.survey_type = SurveyType::EmployeeEngagement;

        vec![satisfaction, nps, onboarding]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    #[default]
    Started,
    Completed,
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseStatus::Started => write!(f, "started"),
            ResponseStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for ResponseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "started" => Ok(ResponseStatus::Started),
            "completed" | "complete" => Ok(ResponseStatus::Completed),
            _ => Err(format!("Invalid response status: {}", s)),
        }
    }
}

impl Lifecycle for ResponseStatus {
    const ALL: &'static [Self] = &[ResponseStatus::Started, ResponseStatus::Completed];

    fn can_transition_to(self, next: Self) -> bool {
        self == ResponseStatus::Started && next == ResponseStatus::Completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistributionChannel {
    #[default]
    Link,
    Email,
    Embed,
    Qr,
}

impl std::fmt::Display for DistributionChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionChannel::Link => write!(f, "link"),
            DistributionChannel::Email => write!(f, "email"),
            DistributionChannel::Embed => write!(f, "embed"),
            DistributionChannel::Qr => write!(f, "qr"),
        }
    }
}

impl std::str::FromStr for DistributionChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "link" => Ok(DistributionChannel::Link),
            "email" => Ok(DistributionChannel::Email),
            "embed" => Ok(DistributionChannel::Embed),
            "qr" => Ok(DistributionChannel::Qr),
            _ => Err(format!("Invalid distribution channel: {}", s)),
        }
    }
}

impl Category for DistributionChannel {
    const ALL: &'static [Self] = &[
        DistributionChannel::Link,
        DistributionChannel::Email,
        DistributionChannel::Embed,
        DistributionChannel::Qr,
    ];
}

/// One respondent's answer set for a survey. Stored in its own collection
/// and removed together with the parent survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    #[serde(flatten)]
    pub base: RecordBase,
    pub survey_id: Uuid,
    pub respondent_email: Option<String>,
    pub status: ResponseStatus,
    pub channel: DistributionChannel,
    /// 0-10 net promoter score, when the survey asked for one.
    pub nps_score: Option<u8>,
    pub duration_secs: u32,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SurveyResponse {
    pub fn new(survey_id: Uuid) -> Self {
        Self {
            base: RecordBase::draft(),
            survey_id,
            respondent_email: None,
            status: ResponseStatus::default(),
            channel: DistributionChannel::default(),
            nps_score: None,
            duration_secs: 0,
            completed_at: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == ResponseStatus::Completed
    }
}

impl Record for SurveyResponse {
    type Status = ResponseStatus;
    type Category = DistributionChannel;

    const COLLECTION: &'static str = "survey_responses";
    const NOUN: &'static str = "response";

    fn base(&self) -> &RecordBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RecordBase {
        &mut self.base
    }

    fn status(&self) -> ResponseStatus {
        self.status
    }

    fn set_status(&mut self, status: ResponseStatus) {
        if status == ResponseStatus::Completed {
            self.completed_at = Some(Utc::now());
        }
        self.status = status;
    }

    fn category(&self) -> DistributionChannel {
        self.channel
    }

    fn label(&self) -> &str {
        self.respondent_email.as_deref().unwrap_or("anonymous")
    }

    fn searchable_fields(&self) -> Vec<&str> {
        self.respondent_email.as_deref().into_iter().collect()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.survey_id.is_nil() {
            return Err(ValidationError::MissingField { field: "survey_id" });
        }
        match self.nps_score {
            Some(score) if score > 10 => Err(ValidationError::InvalidValue {
                field: "nps_score",
                message: format!("{} is outside 0-10", score),
            }),
            _ => Ok(()),
        }
    }

    fn duplicate(&self) -> Self {
        Self {
            base: self.base.duplicate(),
            respondent_email: self.respondent_email.clone(),
            channel: self.channel,
            ..SurveyResponse::new(self.survey_id)
        }
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.survey_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_survey_transitions() {
        assert!(SurveyStatus::Draft.can_transition_to(SurveyStatus::Active));
        assert!(SurveyStatus::Active.can_transition_to(SurveyStatus::Paused));
        assert!(SurveyStatus::Paused.can_transition_to(SurveyStatus::Closed));
        assert!(!SurveyStatus::Draft.can_transition_to(SurveyStatus::Draft));
        assert!(!SurveyStatus::Closed.can_transition_to(SurveyStatus::Active));
        assert!(SurveyStatus::Closed.is_terminal());
        assert_eq!(SurveyStatus::initial(), SurveyStatus::Draft);
    }

    #[test]
    fn test_survey_type_parse() {
        assert_eq!("nps".parse::<SurveyType>().unwrap(), SurveyType::Nps);
        assert_eq!(
            "market_research".parse::<SurveyType>().unwrap(),
            SurveyType::MarketResearch
        );
        assert!("poll".parse::<SurveyType>().is_err());
    }

    #[test]
    fn test_publish_and_close_stamp_dates() {
        let mut survey = Survey::new("Pulse".to_string());
        survey.set_status(SurveyStatus::Active);
        assert!(survey.published_at.is_some());
        survey.set_status(SurveyStatus::Closed);
        assert!(survey.closed_at.is_some());
    }

    #[test]
    fn test_duplicate_resets_counters() {
        let mut survey = Survey::new("Pulse".to_string());
        survey.base.id = Uuid::new_v4();
        survey.status = SurveyStatus::Active;
        survey.total_responses = 40;
        survey.completed_responses = 30;
        survey.description = "weekly".to_string();

        let copy = survey.duplicate();
        assert!(copy.base.id.is_nil());
        assert_eq!(copy.title, "Pulse (Copy)");
        assert_eq!(copy.status, SurveyStatus::Draft);
        assert_eq!(copy.total_responses, 0);
        assert_eq!(copy.completed_responses, 0);
        assert_eq!(copy.description, "weekly");
    }

    #[test]
    fn test_completion_rate() {
        let mut survey = Survey::new("Pulse".to_string());
        assert_eq!(survey.completion_rate(), 0.0);
        survey.total_responses = 10;
        survey.completed_responses = 8;
        assert_eq!(survey.completion_rate(), 80.0);
    }

    #[test]
    fn test_response_score_validation() {
        let mut response = SurveyResponse::new(Uuid::new_v4());
        response.nps_score = Some(11);
        assert!(response.validate().is_err());
        response.nps_score = Some(10);
        assert!(response.validate().is_ok());
        assert!(SurveyResponse::new(Uuid::nil()).validate().is_err());
    }

    #[test]
    fn test_survey_serializes_flat() {
        let survey = Survey::new("Pulse".to_string());
        let json = serde_json::to_value(&survey).unwrap();
        assert_eq!(json["title"], "Pulse");
        assert_eq!(json["status"], "draft");
        assert_eq!(json["survey_type"], "customer-feedback");
        assert!(json.get("id").is_some());
    }
}
