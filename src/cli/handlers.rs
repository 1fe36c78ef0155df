use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::commands::Board;
use super::records::{check_described, CliRecord, DraftFields};
use crate::config::{find_project_root, DashConfig, DASHVIEW_DIR};
use crate::entity::{
    Actor, Channel, Checklist, Flow, Record, ResponseStatus, Survey, SurveyResponse, SurveyStatus,
    TeamMember, TestSpec,
};
use crate::error::{DashviewError, Result};
use crate::filter::{parse_query, Filters, Selector};
use crate::gateway::{capitalize, MutationError, MutationKind, Notice, ValidationError};
use crate::remote::{DeleteMode, RemoteService, SqliteRemote};
use crate::stats::{OnboardingStats, SurveyStats, TeamStats, TestStats};
use crate::store::{LoadOutcome, LoadState};
use crate::view::CollectionView;

/// Everything a command needs: project paths, config, actor and the
/// backing service.
pub struct Context {
    pub root: PathBuf,
    pub config: DashConfig,
    actor: Option<Actor>,
    remote: Arc<SqliteRemote>,
}

impl Context {
    pub fn open(explicit_actor: Option<&str>) -> Result<Self> {
        let root = find_project_root().ok_or(DashviewError::NotInitialized)?;
        let dir = root.join(DASHVIEW_DIR);
        let config = DashConfig::load(&dir)?;
        let actor = config.resolve_actor(explicit_actor);
        let remote = Arc::new(SqliteRemote::open(&dir)?);
        debug!(root = %root.display(), actor = ?actor, "opened project");
        Ok(Self {
            root,
            config,
            actor,
            remote,
        })
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    /// A loaded view over collection `R`.
    pub async fn view<R: Record>(&self) -> Result<CollectionView<R>> {
        let remote: Arc<dyn RemoteService<R>> = self.remote.clone();
        let view = CollectionView::new(remote, self.config.load_options(), self.config.delete_mode);
        if let LoadOutcome::Failed(reason) = view.load(self.actor()).await {
            return Err(DashviewError::LoadFailed(reason));
        }
        Ok(view)
    }
}

fn short_id(id: Uuid) -> String {
    id.to_string()[..7].to_string()
}

fn sample_marker<R: Record>(record: &R) -> &'static str {
    if record.is_fixture() {
        " (sample)"
    } else {
        ""
    }
}

/// Find the single record whose id starts with `prefix`.
fn resolve_id<R: Record>(records: &[R], prefix: &str) -> Result<Uuid> {
    let prefix = prefix.trim().to_lowercase();
    if prefix.is_empty() {
        return Err(DashviewError::RecordNotFound(prefix));
    }
    let matches: Vec<Uuid> = records
        .iter()
        .map(|r| r.id())
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(DashviewError::RecordNotFound(prefix)),
        many => Err(DashviewError::AmbiguousId(prefix, many.len())),
    }
}

fn parse_arg<T: FromStr<Err = String>>(raw: &str) -> Result<T> {
    raw.parse().map_err(DashviewError::InvalidArgument)
}

/// Turn a gateway result into a CLI result carrying the failure notice.
fn settle<T>(kind: MutationKind, noun: &str, result: std::result::Result<T, MutationError>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(MutationError::Validation(ValidationError::ActorRequired)) => Err(DashviewError::NoActor),
        Err(e) => Err(DashviewError::MutationFailed(Notice::failure(kind, noun, &e))),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_saved<R: CliRecord>(verb: &str, record: &R, json: bool) -> Result<()> {
    if json {
        return print_json(record);
    }
    println!(
        "{} {} ({}) - {}",
        verb,
        R::NOUN,
        short_id(record.id()),
        record.label()
    );
    Ok(())
}

pub fn handle_init(actor: Option<String>, no_fixtures: bool, hard_delete: bool) -> Result<()> {
    let root = env::current_dir()?;
    let dir = root.join(DASHVIEW_DIR);
    if dir.exists() {
        return Err(DashviewError::AlreadyInitialized);
    }
    fs::create_dir_all(&dir)?;

    let config = DashConfig {
        actor: actor.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()),
        fixtures: !no_fixtures,
        delete_mode: if hard_delete {
            DeleteMode::Hard
        } else {
            DeleteMode::Soft
        },
        ..DashConfig::default()
    };
    config.save(&dir)?;
    SqliteRemote::open(&dir)?;

    println!("Initialized dashview project in {}", root.display());
    if let Some(ref actor) = config.actor {
        println!("  actor: {}", actor);
    }
    Ok(())
}

pub async fn handle_add<R: CliRecord>(
    ctx: &Context,
    fields: DraftFields,
    category: Option<String>,
    tags: Vec<String>,
    json: bool,
) -> Result<()> {
    let mut draft = R::draft(fields)?;
    if let Some(raw) = category {
        draft.set_category(parse_arg(&raw)?);
    }
    draft.base_mut().tags = tags;

    let view = ctx.view::<R>().await?;
    let created = settle(
        MutationKind::Create,
        R::NOUN,
        view.gateway().create(ctx.actor(), draft).await,
    )?;
    print_saved("Created", &created, json)
}

pub async fn handle_list<R: CliRecord>(
    ctx: &Context,
    query: Vec<String>,
    search: Option<String>,
    status: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
    json: bool,
) -> Result<()> {
    let mut filters: Filters<R> =
        parse_query(&query.join(" ")).map_err(DashviewError::InvalidArgument)?;
    if let Some(term) = search {
        filters.search = term;
    }
    if let Some(raw) = status {
        filters.status = raw.parse::<Selector<R::Status>>().map_err(DashviewError::InvalidArgument)?;
    }
    if let Some(raw) = category {
        filters.category = raw
            .parse::<Selector<R::Category>>()
            .map_err(DashviewError::InvalidArgument)?;
    }
    filters.tags.extend(tags);

    let mut view = ctx.view::<R>().await?;
    view.set_filters(filters);
    let shown = view.projection().await;

    if json {
        return print_json(&shown);
    }
    if shown.is_empty() {
        if view.records().await.is_empty() {
            println!("No {} found.", R::PLURAL);
        } else {
            println!("No {} match the filters.", R::PLURAL);
        }
        return Ok(());
    }

    for record in &shown {
        println!(
            "  ({}) [{}|{}] {}{}{}",
            short_id(record.id()),
            record.status(),
            record.category(),
            record.label(),
            record.columns(),
            sample_marker(record)
        );
        if !record.base().tags.is_empty() {
            println!("      tags: {}", record.base().tags.join(", "));
        }
    }
    if view.load_state().await == LoadState::Fixture {
        println!("\nShowing sample {}. Add your own with 'dashview add'.", R::PLURAL);
    }
    Ok(())
}

pub async fn handle_get<R: CliRecord>(ctx: &Context, id: String, json: bool) -> Result<()> {
    let view = ctx.view::<R>().await?;
    let id = resolve_id(&view.records().await, &id)?;
    let record = view
        .get(id)
        .await
        .ok_or_else(|| DashviewError::RecordNotFound(id.to_string()))?;

    if json {
        return print_json(&record);
    }
    println!("{} ({}){}", capitalize(R::NOUN), record.id(), sample_marker(&record));
    println!("Title: {}", record.label());
    println!("Status: {}", record.status());
    println!("Type: {}", record.category());
    println!("Created: {}", record.base().created_at.format("%Y-%m-%d %H:%M"));
    if let Some(ref author) = record.base().created_by {
        println!("Author: {}", author);
    }
    if !record.base().tags.is_empty() {
        println!("Tags: {}", record.base().tags.join(", "));
    }
    for (field, value) in record.details() {
        println!("{}: {}", field, value);
    }
    Ok(())
}

pub async fn handle_status<R: CliRecord>(
    ctx: &Context,
    id: String,
    status: String,
    json: bool,
) -> Result<()> {
    let status: R::Status = parse_arg(&status)?;
    let view = ctx.view::<R>().await?;
    let id = resolve_id(&view.records().await, &id)?;

    let updated = settle(
        MutationKind::Update,
        R::NOUN,
        view.gateway().update_status(ctx.actor(), id, status).await,
    )?;
    if json {
        return print_json(&updated);
    }
    println!(
        "Updated {} ({}) - {} [{}]",
        R::NOUN,
        short_id(updated.id()),
        updated.label(),
        updated.status()
    );
    Ok(())
}

/// Field changes accepted by `dashview edit`.
#[derive(Debug, Default)]
pub struct EditFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub remove_tags: Vec<String>,
}

pub async fn handle_edit<R: CliRecord>(ctx: &Context, id: String, fields: EditFields, json: bool) -> Result<()> {
    check_described::<R>(fields.description.as_ref())?;
    let category = fields
        .category
        .as_deref()
        .map(parse_arg::<R::Category>)
        .transpose()?;

    let view = ctx.view::<R>().await?;
    let id = resolve_id(&view.records().await, &id)?;
    let before = view.get(id).await;

    let EditFields {
        title,
        description,
        tags,
        remove_tags,
        ..
    } = fields;
    let edited = settle(
        MutationKind::Update,
        R::NOUN,
        view.gateway()
            .edit(ctx.actor(), id, move |record: &mut R| {
                if let Some(title) = title {
                    record.set_label(title);
                }
                if let Some(description) = description {
                    record.set_description(description);
                }
                if let Some(category) = category {
                    record.set_category(category);
                }
                let current = &mut record.base_mut().tags;
                for tag in tags {
                    if !current.contains(&tag) {
                        current.push(tag);
                    }
                }
                current.retain(|t| !remove_tags.contains(t));
            })
            .await,
    )?;

    if before.as_ref() == Some(&edited) && !json {
        println!("No changes to {} ({})", R::NOUN, short_id(id));
        return Ok(());
    }
    print_saved("Updated", &edited, json)
}

pub async fn handle_delete<R: CliRecord>(ctx: &Context, id: String, force: bool) -> Result<()> {
    if ctx.actor().is_none() {
        return Err(DashviewError::NoActor);
    }
    let view = ctx.view::<R>().await?;
    let id = resolve_id(&view.records().await, &id)?;
    let confirmation = settle(
        MutationKind::Delete,
        R::NOUN,
        view.gateway().confirm_delete(id).await,
    )?;
    let label = confirmation.label().to_string();

    if !force {
        eprintln!("Delete {} ({}) - {}? [y/N] ", R::NOUN, short_id(id), label);

        if atty::is(atty::Stream::Stdin) {
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled.");
                return Ok(());
            }
        } else {
            return Err(DashviewError::InvalidArgument(
                "Use --force to delete in non-interactive mode".to_string(),
            ));
        }
    }

    settle(
        MutationKind::Delete,
        R::NOUN,
        view.gateway().delete(ctx.actor(), confirmation).await,
    )?;
    println!("Deleted {} ({}) - {}", R::NOUN, short_id(id), label);
    Ok(())
}

pub async fn handle_duplicate<R: CliRecord>(ctx: &Context, id: String, json: bool) -> Result<()> {
    let view = ctx.view::<R>().await?;
    let id = resolve_id(&view.records().await, &id)?;
    let copy = settle(
        MutationKind::Create,
        R::NOUN,
        view.gateway().duplicate(ctx.actor(), id).await,
    )?;
    print_saved("Created", &copy, json)
}

/// Options for a recorded survey response.
#[derive(Debug, Default)]
pub struct ResponseFields {
    pub score: Option<u8>,
    pub channel: Option<String>,
    pub email: Option<String>,
}

pub async fn handle_respond(ctx: &Context, survey_id: String, fields: ResponseFields, json: bool) -> Result<()> {
    let surveys = ctx.view::<Survey>().await?;
    let survey_id = resolve_id(&surveys.records().await, &survey_id)?;
    let survey = surveys
        .get(survey_id)
        .await
        .ok_or_else(|| DashviewError::RecordNotFound(survey_id.to_string()))?;
    if survey.is_fixture() {
        return Err(DashviewError::InvalidArgument(format!(
            "'{}' is a sample survey and cannot take responses",
            survey.title
        )));
    }
    if survey.status != SurveyStatus::Active {
        return Err(DashviewError::InvalidArgument(format!(
            "Survey '{}' is {} and not accepting responses",
            survey.title, survey.status
        )));
    }

    let mut response = SurveyResponse::new(survey_id);
    response.nps_score = fields.score;
    response.respondent_email = fields.email;
    if let Some(raw) = fields.channel {
        response.channel = parse_arg(&raw)?;
    }
    response.status = ResponseStatus::Completed;
    response.completed_at = Some(Utc::now());

    let responses = ctx.view::<SurveyResponse>().await?;
    let saved = record_response(&surveys, &responses, ctx.actor(), response).await?;

    if json {
        return print_json(&saved);
    }
    println!(
        "Recorded response ({}) to survey ({}) - {}",
        short_id(saved.id()),
        short_id(survey_id),
        survey.title
    );
    Ok(())
}

/// Save `response` and count it on its survey. The response is removed
/// again when the survey's counters cannot be updated.
async fn record_response(
    surveys: &CollectionView<Survey>,
    responses: &CollectionView<SurveyResponse>,
    actor: Option<&Actor>,
    response: SurveyResponse,
) -> Result<SurveyResponse> {
    let survey_id = response.survey_id;
    let saved = settle(
        MutationKind::Create,
        SurveyResponse::NOUN,
        responses.gateway().create(actor, response).await,
    )?;

    let counted = surveys
        .gateway()
        .edit(actor, survey_id, |s: &mut Survey| {
            s.total_responses += 1;
            s.completed_responses += 1;
        })
        .await;
    if let Err(e) = counted {
        warn!(survey = %survey_id, response = %saved.id(), error = %e, "survey not updated, removing response");
        let removed = match responses.gateway().confirm_delete(saved.id()).await {
            Ok(confirmation) => responses.gateway().delete(actor, confirmation).await,
            Err(e) => Err(e),
        };
        if let Err(e) = removed {
            warn!(response = %saved.id(), error = %e, "could not remove orphaned response");
        }
        return settle(MutationKind::Update, Survey::NOUN, Err(e));
    }
    Ok(saved)
}

pub async fn handle_stats(ctx: &Context, board: Board, json: bool) -> Result<()> {
    match board {
        Board::Surveys => {
            let surveys = ctx.view::<Survey>().await?.records().await;
            let responses = ctx.view::<SurveyResponse>().await?.records().await;
            let stats = SurveyStats::compute(&surveys, &responses, Utc::now());
            if json {
                return print_json(&stats);
            }
            println!("Surveys: {} ({} active, {} drafts)", stats.total, stats.active, stats.drafts);
            println!("Responses: {}", stats.total_responses);
            println!("Avg completion: {:.1}%", stats.avg_completion_rate);
            println!(
                "NPS: {} ({:.1}% promoters, {:.1}% passives, {:.1}% detractors)",
                stats.nps.nps,
                stats.nps.promoter_share,
                stats.nps.passive_share,
                stats.nps.detractor_share
            );
            println!(
                "This week: {} responses ({:+}% vs last week)",
                stats.responses_this_week, stats.weekly_change
            );
        }
        Board::Onboarding => {
            let flows = ctx.view::<Flow>().await?.records().await;
            let checklists = ctx.view::<Checklist>().await?.records().await;
            let stats = OnboardingStats::compute(&flows, &checklists);
            if json {
                return print_json(&stats);
            }
            println!("Flows: {} ({} active)", stats.total_flows, stats.active_flows);
            println!("Views: {}", stats.total_views);
            println!(
                "Completions: {} ({:.1}%)",
                stats.total_completions, stats.completion_rate
            );
            println!("Avg time to complete: {:.1}s", stats.avg_time_to_complete);
            println!(
                "Checklists: {} ({} active)",
                stats.total_checklists, stats.active_checklists
            );
        }
        Board::Team => {
            let members = ctx.view::<TeamMember>().await?.records().await;
            let channels = ctx.view::<Channel>().await?.records().await;
            let stats = TeamStats::compute(&members, &channels);
            if json {
                return print_json(&stats);
            }
            println!(
                "Members: {} ({} online, {} in meetings, {} admins)",
                stats.members, stats.online, stats.in_meeting, stats.admins
            );
            println!("Avg performance: {:.1}", stats.avg_performance);
            println!(
                "Channels: {} ({} active, {} unread, {} mentions)",
                stats.channels, stats.active_channels, stats.unread, stats.mentions
            );
        }
        Board::Tests => {
            let specs = ctx.view::<TestSpec>().await?.records().await;
            let stats = TestStats::compute(&specs);
            if json {
                return print_json(&stats);
            }
            println!(
                "Tests: {} ({} passed, {} failed, {} skipped, {} flaky, {} pending)",
                stats.total, stats.passed, stats.failed, stats.skipped, stats.flaky, stats.pending
            );
            println!("Pass rate: {:.1}%", stats.pass_rate);
            println!("Flaky rate: {:.1}%", stats.flaky_rate);
            println!("Avg duration: {:.0}ms", stats.avg_duration_ms);
            println!("Avg coverage: {:.1}%", stats.avg_coverage);
        }
    }
    Ok(())
}
