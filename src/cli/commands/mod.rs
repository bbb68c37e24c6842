//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod doctor;
mod evaluate;
mod index;
mod process;
mod search;
mod serve;
mod validate;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use evaluate::run_evaluate;
pub use index::run_index;
pub use process::run_process;
pub use search::run_search;
pub use serve::run_serve;
pub use validate::run_validate;
