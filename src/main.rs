use clap::Parser;
use dashview::cli::{
    handle_add, handle_delete, handle_duplicate, handle_edit, handle_get, handle_init, handle_list,
    handle_respond, handle_stats, handle_status, AddArgs, Cli, Commands, Context, DraftFields,
    EditArgs, EditFields, Kind, ResponseFields,
};
use dashview::config::{find_project_root, DashConfig, DASHVIEW_DIR};
use dashview::entity::{Channel, Checklist, Flow, Survey, SurveyResponse, TeamMember, TestSpec};
use dashview::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Run `$body` with `$R` bound to the record type behind `$kind`.
macro_rules! with_kind {
    ($kind:expr, $R:ident => $body:expr) => {
        match $kind {
            Kind::Survey => {
                type $R = Survey;
                $body
            }
            Kind::Response => {
                type $R = SurveyResponse;
                $body
            }
            Kind::Flow => {
                type $R = Flow;
                $body
            }
            Kind::Checklist => {
                type $R = Checklist;
                $body
            }
            Kind::Member => {
                type $R = TeamMember;
                $body
            }
            Kind::Channel => {
                type $R = Channel;
                $body
            }
            Kind::Test => {
                type $R = TestSpec;
                $body
            }
        }
    };
}

/// Log filter from RUST_LOG, else from the project config.
fn init_tracing() {
    let level = find_project_root()
        .and_then(|root| DashConfig::load(&root.join(DASHVIEW_DIR)).ok())
        .map(|config| config.log_level)
        .unwrap_or_else(|| DashConfig::default().log_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Init {
        no_fixtures,
        hard_delete,
    } = cli.command
    {
        return handle_init(cli.actor, no_fixtures, hard_delete);
    }

    let ctx = Context::open(cli.actor.as_deref())?;
    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Add(AddArgs {
            kind,
            title,
            description,
            category,
            email,
            file,
            tags,
            json,
        }) => {
            let fields = DraftFields {
                title,
                description,
                email,
                file,
            };
            with_kind!(kind, R => handle_add::<R>(&ctx, fields, category, tags, json).await)
        }
        Commands::List {
            kind,
            query,
            search,
            status,
            category,
            tags,
            json,
        } => with_kind!(kind, R => handle_list::<R>(&ctx, query, search, status, category, tags, json).await),
        Commands::Get { kind, id, json } => {
            with_kind!(kind, R => handle_get::<R>(&ctx, id, json).await)
        }
        Commands::Status {
            kind,
            id,
            status,
            json,
        } => with_kind!(kind, R => handle_status::<R>(&ctx, id, status, json).await),
        Commands::Edit(EditArgs {
            kind,
            id,
            title,
            description,
            category,
            tags,
            remove_tags,
            json,
        }) => {
            let fields = EditFields {
                title,
                description,
                category,
                tags,
                remove_tags,
            };
            with_kind!(kind, R => handle_edit::<R>(&ctx, id, fields, json).await)
        }
        Commands::Delete { kind, id, force } => {
            with_kind!(kind, R => handle_delete::<R>(&ctx, id, force).await)
        }
        Commands::Duplicate { kind, id, json } => {
            with_kind!(kind, R => handle_duplicate::<R>(&ctx, id, json).await)
        }
        Commands::Respond {
            survey_id,
            score,
            channel,
            email,
            json,
        } => {
            let fields = ResponseFields {
                score,
                channel,
                email,
            };
            handle_respond(&ctx, survey_id, fields, json).await
        }
        Commands::Stats { board, json } => handle_stats(&ctx, board, json).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
