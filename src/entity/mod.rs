mod flow;
mod member;
mod survey;
mod test_spec;

pub use flow::{Checklist, ChecklistItem, Flow, FlowStatus, FlowStep, FlowType, StepType};
pub use member::{Channel, ChannelStatus, ChannelType, MemberRole, MemberStatus, TeamMember};
pub use survey::{
    DistributionChannel, Question, QuestionType, ResponseStatus, Survey, SurveyResponse,
    SurveyStatus, SurveyType,
};
pub use test_spec::{BrowserType, TestSpec, TestStatus, TestType};

use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gateway::ValidationError;

/// Namespace for fixture ids.
const FIXTURE_NAMESPACE: Uuid = Uuid::from_u128(0x6d1c_2f4e_8a3b_5c7d_9e0f_1a2b_3c4d_5e6f);

/// Where a record in a store came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Live,
    Fixture,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Live => write!(f, "live"),
            Origin::Fixture => write!(f, "fixture"),
        }
    }
}

/// The authenticated identity that store loads and mutations are scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Base fields shared by all records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordBase {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub origin: Origin,
}

impl RecordBase {
    /// Base for a record that has not been persisted yet. The remote service
    /// assigns the id and timestamps on insert.
    pub fn draft() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            created_by: None,
            tags: Vec::new(),
            origin: Origin::Live,
        }
    }

    /// Base for an illustrative record shown when a collection is empty.
    ///
    /// The id is derived from `key`, so a fixture keeps its id across loads.
    pub fn fixture(key: &str, age_days: i64) -> Self {
        let at = Utc::now() - chrono::Duration::days(age_days);
        Self {
            id: Uuid::new_v5(&FIXTURE_NAMESPACE, key.as_bytes()),
            created_at: at,
            updated_at: at,
            deleted_at: None,
            created_by: None,
            tags: Vec::new(),
            origin: Origin::Fixture,
        }
    }

    /// Copy of this base suitable for a duplicated record: identity,
    /// ownership and timestamps are cleared, tags are kept.
    pub fn duplicate(&self) -> Self {
        Self {
            tags: self.tags.clone(),
            ..Self::draft()
        }
    }

    pub fn is_persisted(&self) -> bool {
        !self.id.is_nil()
    }
}

/// A closed status enumeration with its transition table.
pub trait Lifecycle:
    Copy
    + Eq
    + Hash
    + Debug
    + Display
    + FromStr<Err = String>
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Every status, initial status first.
    const ALL: &'static [Self];

    fn initial() -> Self {
        Self::ALL[0]
    }

    /// Whether `self -> next` is a legal transition. Staying in the same
    /// status is never a transition.
    fn can_transition_to(self, next: Self) -> bool;

    fn is_terminal(self) -> bool {
        !Self::ALL.iter().any(|next| self.can_transition_to(*next))
    }
}

/// A closed category enumeration (survey type, flow type, member role...).
pub trait Category:
    Copy
    + Eq
    + Hash
    + Debug
    + Display
    + FromStr<Err = String>
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const ALL: &'static [Self];
}

/// A domain record held by a [`RecordStore`](crate::store::RecordStore).
pub trait Record:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Status: Lifecycle;
    type Category: Category;

    /// Remote collection (table) name.
    const COLLECTION: &'static str;
    /// Human noun used in notices ("survey", "flow").
    const NOUN: &'static str;
    /// Collections whose rows are removed along with a record of this type.
    const DEPENDENTS: &'static [&'static str] = &[];

    fn base(&self) -> &RecordBase;
    fn base_mut(&mut self) -> &mut RecordBase;

    fn status(&self) -> Self::Status;
    fn set_status(&mut self, status: Self::Status);
    fn category(&self) -> Self::Category;

    /// Primary display text (title or name).
    fn label(&self) -> &str;

    /// Human-readable fields matched by text search.
    fn searchable_fields(&self) -> Vec<&str>;

    /// Local checks run before any create or edit reaches the remote service.
    fn validate(&self) -> Result<(), ValidationError>;

    /// New creation payload copied from this record: identity cleared,
    /// status reset to initial and counters reset to zero.
    fn duplicate(&self) -> Self;

    /// Owning record, for records stored in a dependent collection.
    fn parent_id(&self) -> Option<Uuid> {
        None
    }

    /// Illustrative records displayed when a live collection is empty.
    fn fixtures() -> Vec<Self> {
        Vec::new()
    }

    fn id(&self) -> Uuid {
        self.base().id
    }

    fn is_fixture(&self) -> bool {
        self.base().origin == Origin::Fixture
    }
}

/// Fail with [`ValidationError::MissingField`] when `value` is blank.
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(())
}

/// Title of a duplicated record.
pub(crate) fn copy_title(title: &str) -> String {
    format!("{} (Copy)", title)
}
