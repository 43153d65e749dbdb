// Data structures (schemas) for the environment documents and the types that
// flow through the install pipeline.

// Typed errors for the pipeline, ledger, store and activation machine.
pub mod errors;
// `config.json`.
pub mod environment_config;
// Validated module definitions.
pub mod module_spec;
// `modules.json`.
pub mod modules_file;
// Dotted-numeric versions.
pub mod version_token;
// Values passed between pipeline stages.
pub mod pipeline;
