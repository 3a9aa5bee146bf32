//! # CLI Module
//!
//! Command-line tooling for checking a route table before it ships.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! Print the radix tree of every method and any route that can never be reached:
//!
//! ```bash
//! muxtree routes --routes routes.yaml
//! ```
//!
//! ### `match`
//!
//! Dispatch paths against the table and print one JSON object per path:
//!
//! ```bash
//! muxtree match --routes routes.yaml --method GET /users/42 /users/42/ /nope
//! ```
//!
//! Options shared by both commands:
//! - `--routes <FILE>` - Route definitions (required)
//! - `--config <FILE>` - Router configuration; without it `MUXTREE_*` variables apply
//!
//! ## Route File
//!
//! ```yaml
//! routes:
//!   - method: GET
//!     pattern: /users/{id:int}
//!     handler: get_user
//!   - method: GET
//!     pattern: /static/*filepath
//!     handler: static_files
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use muxtree::cli::{run_cli, Cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse(), &mut std::io::stdout())?;
//! ```

mod commands;
mod route_file;


pub use commands::{run_cli, Cli, Commands, MatchReport};
pub use route_file::{parse_method, RouteFile, RouteSpec, HANDLER_KEY};
