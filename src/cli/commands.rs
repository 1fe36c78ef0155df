use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "dashview")]
#[command(version, about = "Dashboards for surveys, onboarding, team and test collections")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Actor whose records are loaded and changed
    #[arg(long, global = true, env = "DASHVIEW_ACTOR")]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Record collections addressable from the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    #[value(alias = "surveys")]
    Survey,
    #[value(alias = "responses")]
    Response,
    #[value(alias = "flows")]
    Flow,
    #[value(alias = "checklists")]
    Checklist,
    #[value(alias = "members")]
    Member,
    #[value(alias = "channels")]
    Channel,
    #[value(alias = "tests")]
    Test,
}

/// Dashboards with summary figures.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Board {
    Surveys,
    Onboarding,
    Team,
    Tests,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new dashview project in the current directory
    Init {
        /// Start with empty collections instead of sample records
        #[arg(long)]
        no_fixtures: bool,

        /// Remove deleted rows instead of marking them deleted
        #[arg(long)]
        hard_delete: bool,
    },

    /// Add a new record
    Add(AddArgs),

    /// List records, optionally filtered
    List {
        #[arg(value_enum)]
        kind: Kind,

        /// Search text with optional "status:", "type:", "tag:" and
        /// "created:>DATE" / "created:<DATE" terms
        #[arg(value_name = "QUERY")]
        query: Vec<String>,

        /// Only records in this status ("all" for every status)
        #[arg(long)]
        status: Option<String>,

        /// Only records of this type ("all" for every type)
        #[arg(long = "type", alias = "category")]
        category: Option<String>,

        /// Case-insensitive text search over titles, names and descriptions
        #[arg(long, short = 's')]
        search: Option<String>,

        /// Only records carrying this tag (can be specified multiple times)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Get a single record by UUID prefix
    Get {
        #[arg(value_enum)]
        kind: Kind,

        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move a record to a new status
    Status {
        #[arg(value_enum)]
        kind: Kind,

        id: String,

        status: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit fields of a record
    Edit(EditArgs),

    /// Delete a record
    Delete {
        #[arg(value_enum)]
        kind: Kind,

        id: String,

        /// Skip the confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Copy a record into a new draft
    Duplicate {
        #[arg(value_enum)]
        kind: Kind,

        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a completed response to an active survey
    Respond {
        /// Survey UUID prefix
        survey_id: String,

        /// NPS score from 0 to 10
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=10))]
        score: Option<u8>,

        /// Distribution channel (link, email, embed, qr)
        #[arg(long)]
        channel: Option<String>,

        /// Respondent email
        #[arg(long)]
        email: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show dashboard summary figures
    Stats {
        #[arg(value_enum)]
        board: Board,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(value_enum)]
    pub kind: Kind,

    /// Title or name
    pub title: String,

    /// Description (job title for members, suite for tests)
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Record type (survey type, flow type, role, channel type, test type)
    #[arg(long = "type", alias = "category")]
    pub category: Option<String>,

    /// Email address (members)
    #[arg(long)]
    pub email: Option<String>,

    /// Spec file path (tests)
    #[arg(long)]
    pub file: Option<String>,

    /// Tags (can be specified multiple times)
    #[arg(long = "tag", short = 't')]
    pub tags: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    #[arg(value_enum)]
    pub kind: Kind,

    pub id: String,

    /// New title or name
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long = "type", alias = "category")]
    pub category: Option<String>,

    /// Tags to add (can be specified multiple times)
    #[arg(long = "tag", short = 't')]
    pub tags: Vec<String>,

    /// Tags to remove (can be specified multiple times)
    #[arg(long = "remove-tag")]
    pub remove_tags: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
