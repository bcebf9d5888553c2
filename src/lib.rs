//! downsort - keep a downloads directory tidy
//!
//! This library watches a directory for newly arrived files and relocates
//! each into a category subfolder chosen by file extension, recording every
//! move in an append-only CSV audit log. A one-shot sweep mode sorts the
//! files already present. Classification, stability detection, collision
//! handling, and auditing are identical in both modes.

pub mod audit;
pub mod category;
pub mod cli;
pub mod config;
pub mod mover;
pub mod notifier;
pub mod output;
pub mod stability;
pub mod watcher;

pub use audit::{AuditLog, MoveRecord};
pub use category::CategoryMap;
pub use config::{CompiledFilters, ConfigError, SorterConfig};
pub use mover::{MoveError, Mover};
pub use notifier::{DesktopNotifier, Notifier, NullNotifier};
pub use stability::StabilityPolicy;
pub use watcher::WatchLoop;

pub use cli::{Cli, Command, run_cli};
