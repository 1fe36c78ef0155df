mod commands;
mod handlers;
mod records;

pub use commands::{AddArgs, Board, Cli, Commands, EditArgs, Kind};
pub use handlers::{
    handle_add, handle_delete, handle_duplicate, handle_edit, handle_get, handle_init, handle_list,
    handle_respond, handle_stats, handle_status, Context, EditFields, ResponseFields,
};
pub use records::{CliRecord, DraftFields};
