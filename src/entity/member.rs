// src/entity/member.rs
use serde::{Deserialize, Serialize};

use super::{copy_title, require, Category, Lifecycle, Record, RecordBase};
use crate::gateway::ValidationError;

/// Presence of a team member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MemberStatus {
    #[default]
    Offline,
    Online,
    Away,
    Dnd,
    InMeeting,
}

impl std::fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberStatus::Offline => write!(f, "offline"),
            MemberStatus::Online => write!(f, "online"),
            MemberStatus::Away => write!(f, "away"),
            MemberStatus::Dnd => write!(f, "dnd"),
            MemberStatus::InMeeting => write!(f, "in-meeting"),
        }
    }
}

impl std::str::FromStr for MemberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "offline" => Ok(MemberStatus::Offline),
            "online" => Ok(MemberStatus::Online),
            "away" => Ok(MemberStatus::Away),
            "dnd" => Ok(MemberStatus::Dnd),
            "in-meeting" => Ok(MemberStatus::InMeeting),
            _ => Err(format!("Invalid member status: {}", s)),
        }
    }
}

impl Lifecycle for MemberStatus {
    const ALL: &'static [Self] = &[
        MemberStatus::Offline,
        MemberStatus::Online,
        MemberStatus::Away,
        MemberStatus::Dnd,
        MemberStatus::InMeeting,
    ];

    // Presence can move freely between states.
    fn can_transition_to(self, next: Self) -> bool {
        self != next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MemberRole {
    Owner,
    Admin,
    #[default]
    Member,
    Guest,
    SingleChannelGuest,
}

impl MemberRole {
    pub fn is_admin(self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Admin)
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberRole::Owner => write!(f, "owner"),
            MemberRole::Admin => write!(f, "admin"),
            MemberRole::Member => write!(f, "member"),
            MemberRole::Guest => write!(f, "guest"),
            MemberRole::SingleChannelGuest => write!(f, "single-channel-guest"),
        }
    }
}

impl std::str::FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "owner" => Ok(MemberRole::Owner),
            "admin" => Ok(MemberRole::Admin),
            "member" => Ok(MemberRole::Member),
            "guest" => Ok(MemberRole::Guest),
            "single-channel-guest" => Ok(MemberRole::SingleChannelGuest),
            _ => Err(format!("Invalid member role: {}", s)),
        }
    }
}

impl Category for MemberRole {
    const ALL: &'static [Self] = &[
        MemberRole::Owner,
        MemberRole::Admin,
        MemberRole::Member,
        MemberRole::Guest,
        MemberRole::SingleChannelGuest,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(flatten)]
    pub base: RecordBase,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub email: String,
    pub role: MemberRole,
    pub status: MemberStatus,
    #[serde(default)]
    pub status_message: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub department: String,
    pub timezone: Option<String>,
    pub tasks_completed: u32,
    pub projects_count: u32,
    pub performance_score: Option<f64>,
    pub is_lead: bool,
}

impl TeamMember {
    pub fn new(name: String, email: String) -> Self {
        Self {
            base: RecordBase::draft(),
            display_name: name.clone(),
            name,
            email,
            role: MemberRole::default(),
            status: MemberStatus::default(),
            status_message: String::new(),
            job_title: String::new(),
            department: String::new(),
            timezone: None,
            tasks_completed: 0,
            projects_count: 0,
            performance_score: None,
            is_lead: false,
        }
    }

    /// Online for team-stats purposes: meetings count as present.
    pub fn is_present(&self) -> bool {
        matches!(self.status, MemberStatus::Online | MemberStatus::InMeeting)
    }
}

impl Record for TeamMember {
    type Status = MemberStatus;
    type Category = MemberRole;

    const COLLECTION: &'static str = "team_members";
    const NOUN: &'static str = "team member";

    fn base(&self) -> &RecordBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RecordBase {
        &mut self.base
    }

    fn status(&self) -> MemberStatus {
        self.status
    }

    fn set_status(&mut self, status: MemberStatus) {
        self.status = status;
    }

    fn category(&self) -> MemberRole {
        self.role
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn searchable_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.display_name.as_str(),
            self.job_title.as_str(),
            self.department.as_str(),
        ]
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        if !self.email.contains('@') {
            return Err(ValidationError::InvalidValue {
                field: "email",
                message: format!("'{}' is not an email address", self.email),
            });
        }
        Ok(())
    }

    // A duplicated member is an invitation template: same role and team
    // placement, no identity or activity.
    fn duplicate(&self) -> Self {
        Self {
            base: self.base.duplicate(),
            name: copy_title(&self.name),
            display_name: copy_title(&self.display_name),
            role: self.role,
            job_title: self.job_title.clone(),
            department: self.department.clone(),
            timezone: self.timezone.clone(),
            ..TeamMember::new(String::new(), self.email.clone())
        }
    }

    fn fixtures() -> Vec<Self> {
        let mut sarah = TeamMember::new("Sarah Chen".to_string(), "sarah@example.com".to_string());
        sarah.base = RecordBase::fixture("member/sarah", 300);
        sarah.role = MemberRole::Owner;
        sarah.status = MemberStatus::Online;
        sarah.job_title = "Engineering Lead".to_string();
        sarah.department = "Engineering".to_string();
        sarah.is_lead = true;

        let mut marcus = TeamMember::new("Marcus Lee".to_string(), "marcus@example.com".to_string());
        marcus.base = RecordBase::fixture("member/marcus", 120);
        marcus.status = MemberStatus::InMeeting;
        marcus.job_title = "Product Designer".to_string();
        marcus.department = "Design".to_string();

        vec![sarah, marcus]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    #[default]
    Active,
    Archived,
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelStatus::Active => write!(f, "active"),
            ChannelStatus::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for ChannelStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ChannelStatus::Active),
            "archived" => Ok(ChannelStatus::Archived),
            _ => Err(format!("Invalid channel status: {}", s)),
        }
    }
}

impl Lifecycle for ChannelStatus {
    const ALL: &'static [Self] = &[ChannelStatus::Active, ChannelStatus::Archived];

    fn can_transition_to(self, next: Self) -> bool {
        self != next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelType {
    #[default]
    Public,
    Private,
    Direct,
    GroupDm,
    Shared,
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelType::Public => write!(f, "public"),
            ChannelType::Private => write!(f, "private"),
            ChannelType::Direct => write!(f, "direct"),
            ChannelType::GroupDm => write!(f, "group-dm"),
            ChannelType::Shared => write!(f, "shared"),
        }
    }
}

impl std::str::FromStr for ChannelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "public" => Ok(ChannelType::Public),
            "private" => Ok(ChannelType::Private),
            "direct" => Ok(ChannelType::Direct),
            "group-dm" => Ok(ChannelType::GroupDm),
            "shared" => Ok(ChannelType::Shared),
            _ => Err(format!("Invalid channel type: {}", s)),
        }
    }
}

impl Category for ChannelType {
    const ALL: &'static [Self] = &[
        ChannelType::Public,
        ChannelType::Private,
        ChannelType::Direct,
        ChannelType::GroupDm,
        ChannelType::Shared,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(flatten)]
    pub base: RecordBase,
    pub name: String,
    pub channel_type: ChannelType,
    pub status: ChannelStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub topic: String,
    pub member_count: u32,
    pub unread_count: u32,
    pub mention_count: u32,
    pub is_pinned: bool,
    pub retention_days: Option<u32>,
}

impl Channel {
    pub fn new(name: String) -> Self {
        Self {
            base: RecordBase::draft(),
            name,
            channel_type: ChannelType::default(),
            status: ChannelStatus::default(),
            description: String::new(),
            topic: String::new(),
            member_count: 0,
            unread_count: 0,
            mention_count: 0,
            is_pinned: false,
            retention_days: None,
        }
    }
}

impl Record for Channel {
    type Status = ChannelStatus;
    type Category = ChannelType;

    const COLLECTION: &'static str = "channels";
    const NOUN: &'static str = "channel";

    fn base(&self) -> &RecordBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RecordBase {
        &mut self.base
    }

    fn status(&self) -> ChannelStatus {
        self.status
    }

    fn set_status(&mut self, status: ChannelStatus) {
        self.status = status;
    }

    fn category(&self) -> ChannelType {
        self.channel_type
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn searchable_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.description.as_str(), self.topic.as_str()]
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        if self.name.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidValue {
                field: "name",
                message: "channel names cannot contain spaces".to_string(),
            });
        }
        Ok(())
    }

    fn duplicate(&self) -> Self {
        Self {
            base: self.base.duplicate(),
            name: format!("{}-copy", self.name),
            channel_type: self.channel_type,
            description: self.description.clone(),
            topic: self.topic.clone(),
            retention_days: self.retention_days,
            ..Channel::new(String::new())
        }
    }

    fn fixtures() -> Vec<Self> {
        let mut general = Channel::new("general".to_string());
        general.base = RecordBase::fixture("channel/general", 300);
        general.description = "Company-wide announcements".to_string();
        general.member_count = 48;
        general.unread_count = 3;
        general.is_pinned = true;

        let mut design = Channel::new("design-reviews".to_string());
        design.base = RecordBase::fixture("channel/design", 60);
        design.channel_type = ChannelType::Private;
        design.member_count = 9;
        design.mention_count = 1;

        vec![general, design]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_moves_freely() {
        assert!(MemberStatus::Offline.can_transition_to(MemberStatus::InMeeting));
        assert!(MemberStatus::Dnd.can_transition_to(MemberStatus::Away));
        assert!(!MemberStatus::Online.can_transition_to(MemberStatus::Online));
        assert!(!MemberStatus::Online.is_terminal());
    }

    #[test]
    fn test_status_parse_accepts_underscores() {
        assert_eq!(
            "in_meeting".parse::<MemberStatus>().unwrap(),
            MemberStatus::InMeeting
        );
        assert_eq!(MemberStatus::InMeeting.to_string(), "in-meeting");
    }

    #[test]
    fn test_member_validation() {
        let member = TeamMember::new("Ada".to_string(), "ada@example.com".to_string());
        assert!(member.validate().is_ok());
        let bad = TeamMember::new("Ada".to_string(), "ada".to_string());
        assert!(bad.validate().is_err());
        let nameless = TeamMember::new(String::new(), "ada@example.com".to_string());
        assert!(nameless.validate().is_err());
    }

    #[test]
    fn test_member_search_fields() {
        let mut member = TeamMember::new("Ada".to_string(), "ada@example.com".to_string());
        member.department = "Research".to_string();
        assert!(member.searchable_fields().contains(&"Research"));
    }

    #[test]
    fn test_channel_name_validation() {
        assert!(Channel::new("general".to_string()).validate().is_ok());
        assert!(Channel::new("two words".to_string()).validate().is_err());
    }

    #[test]
    fn test_channel_duplicate() {
        let mut channel = Channel::new("general".to_string());
        channel.unread_count = 4;
        channel.status = ChannelStatus::Archived;
        let copy = channel.duplicate();
        assert_eq!(copy.name, "general-copy");
        assert_eq!(copy.unread_count, 0);
        assert_eq!(copy.status, ChannelStatus::Active);
    }
}
