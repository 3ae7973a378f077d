//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `init` | Create `.depplan/` with a starter config |
//! | `resolve <manifest>` | Resolve a manifest into a build plan |
//! | `generators` | List generator names usable in a manifest |
//! | `plugin list`, `plugin info` | Inspect provider and generator plugins |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Exit Codes
//!
//! A failed resolution prints `Error [kind]: message` (or a JSON object with
//! `kind` and `error`) to stderr and exits with the code of its
//! [`crate::domain::ResolveError`] kind, from 2 to 10. Other failures exit 1.
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logs on stderr; `RUST_LOG` takes
//! precedence:
//! ```bash
//! depplan --verbose resolve depplan.toml -s os=Linux
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod generators_cmd;
mod output;
mod plugin_cmd;
mod resolve;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
pub use resolve::ResolveArgs;
