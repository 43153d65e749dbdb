// Core library of the environment manager: the install pipeline, the state
// ledger and the PATH activation machine, plus their I/O seams.

pub mod archive_normalizer;
pub mod artifact_fetcher;
pub mod config_loading;
pub mod context;
pub mod http_client;
pub mod kv_store;
pub mod module_installer;
pub mod path_activation;
pub mod paths;
pub mod process_runner;
pub mod state_ledger;
pub mod utilities;
pub mod version_oracle;
