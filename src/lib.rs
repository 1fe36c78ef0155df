pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod projection;
pub mod remote;
pub mod stats;
pub mod store;
pub mod view;

pub use error::{DashviewError, Result};
pub use gateway::{MutationGateway, Notice};
pub use remote::{MemoryRemote, RemoteService, SqliteRemote};
pub use store::RecordStore;
pub use view::CollectionView;
