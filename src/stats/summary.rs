use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::{average, change_rate, count, rate, round1, NpsDistribution};
use crate::entity::{
    Channel, ChannelStatus, Checklist, Flow, FlowStatus, MemberStatus, Survey, SurveyResponse,
    SurveyStatus, TeamMember, TestSpec, TestStatus,
};

/// Survey dashboard header figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyStats {
    pub total: usize,
    pub active: usize,
    pub drafts: usize,
    pub total_responses: u64,
    /// Mean completion rate of surveys that have responses.
    pub avg_completion_rate: f64,
    pub nps: NpsDistribution,
    pub responses_this_week: usize,
    pub responses_last_week: usize,
    pub weekly_change: i64,
}

impl SurveyStats {
    pub fn compute(surveys: &[Survey], responses: &[SurveyResponse], now: DateTime<Utc>) -> Self {
        let week = Duration::days(7);
        let in_window = |r: &SurveyResponse, start: DateTime<Utc>, end: DateTime<Utc>| {
            r.base.created_at >= start && r.base.created_at < end
        };
        let this_week = count(responses, |r| in_window(r, now - week, now));
        let last_week = count(responses, |r| in_window(r, now - week - week, now - week));

        Self {
            total: surveys.len(),
            active: count(surveys, |s| s.status == SurveyStatus::Active),
            drafts: count(surveys, |s| s.status == SurveyStatus::Draft),
            total_responses: surveys.iter().map(|s| s.total_responses as u64).sum(),
            avg_completion_rate: round1(average(
                surveys
                    .iter()
                    .map(|s| (s.total_responses > 0).then(|| s.completion_rate())),
            )),
            nps: NpsDistribution::from_scores(responses.iter().filter_map(|r| r.nps_score)),
            responses_this_week: this_week,
            responses_last_week: last_week,
            weekly_change: change_rate(this_week, last_week),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnboardingStats {
    pub total_flows: usize,
    pub active_flows: usize,
    pub total_views: u64,
    pub total_completions: u64,
    /// Completions over views across all flows.
    pub completion_rate: f64,
    pub avg_time_to_complete: f64,
    pub total_checklists: usize,
    pub active_checklists: usize,
}

impl OnboardingStats {
    pub fn compute(flows: &[Flow], checklists: &[Checklist]) -> Self {
        let views: u64 = flows.iter().map(|f| f.views as u64).sum();
        let completions: u64 = flows.iter().map(|f| f.completions as u64).sum();

        Self {
            total_flows: flows.len(),
            active_flows: count(flows, |f| f.status == FlowStatus::Active),
            total_views: views,
            total_completions: completions,
            completion_rate: rate(completions as f64, views as f64),
            avg_time_to_complete: round1(average(
                flows
                    .iter()
                    .map(|f| (f.completions > 0).then_some(f.avg_time_to_complete)),
            )),
            total_checklists: checklists.len(),
            active_checklists: count(checklists, |c| c.status == FlowStatus::Active),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamStats {
    pub members: usize,
    /// Online including members in a meeting.
    pub online: usize,
    pub in_meeting: usize,
    /// Admins including owners.
    pub admins: usize,
    pub avg_performance: f64,
    pub channels: usize,
    pub active_channels: usize,
    pub unread: u64,
    pub mentions: u64,
}

impl TeamStats {
    pub fn compute(members: &[TeamMember], channels: &[Channel]) -> Self {
        Self {
            members: members.len(),
            online: count(members, |m| m.is_present()),
            in_meeting: count(members, |m| m.status == MemberStatus::InMeeting),
            admins: count(members, |m| m.role.is_admin()),
            avg_performance: round1(average(members.iter().map(|m| m.performance_score))),
            channels: channels.len(),
            active_channels: count(channels, |c| c.status == ChannelStatus::Active),
            unread: channels.iter().map(|c| c.unread_count as u64).sum(),
            mentions: channels.iter().map(|c| c.mention_count as u64).sum(),
        }
    }
}

/// Test run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub flaky: usize,
    /// Pending or running.
    pub pending: usize,
    pub pass_rate: f64,
    pub flaky_rate: f64,
    pub avg_duration_ms: f64,
    pub avg_coverage: f64,
}

impl TestStats {
    pub fn compute(specs: &[TestSpec]) -> Self {
        let total = specs.len();
        let passed = count(specs, |t| t.status == TestStatus::Passed);
        let flaky = count(specs, |t| t.status == TestStatus::Flaky);

        Self {
            total,
            passed,
            failed: count(specs, |t| t.status == TestStatus::Failed),
            skipped: count(specs, |t| t.status == TestStatus::Skipped),
            flaky,
            pending: count(specs, |t| !t.status.is_finished()),
            pass_rate: rate(passed as f64, total as f64),
            flaky_rate: rate(flaky as f64, total as f64),
            avg_duration_ms: round1(average(
                specs
                    .iter()
                    .filter(|t| t.status.is_finished())
                    .map(|t| Some(t.duration_ms as f64)),
            )),
            avg_coverage: round1(average(specs.iter().map(|t| t.coverage))),
        }
    }
}
