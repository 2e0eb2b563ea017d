//! Where Quill's [`Config`](quill_domain::Config) comes from.
//!
//! `QUILL_*` environment variables win when `QUILL_ENVMNT` is set;
//! otherwise a `quill.toml`/`config.toml` (or JSON) file is read.

pub mod loader;

pub use loader::{find_config_file, load, load_from_env, load_from_file};
