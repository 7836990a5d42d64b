//! End-to-end runs.
//!
//! This module combines [`crate::note_elem`] parsing with input/output handling into a single
//! workflow. It's useful for building functionality like the CLI's, but running it
//! within-process.
//!
//! ## Example
//!
//! ```
//! # use notemark::run;
//!
//! // First, let's define a mocked I/O. Replace this with whatever you need.
//! #[derive(Default)]
//! struct MockIo {
//!     stdout: Vec<u8>,
//! }
//!
//! impl run::OsFacade for MockIo {
//!     fn read_stdin(&self) -> std::io::Result<String> {
//!         Ok("* hello\n* world".to_string())
//!     }
//!
//!     fn read_file(&self, path: &str) -> std::io::Result<String> {
//!         Err(std::io::Error::new(std::io::ErrorKind::NotFound, path))
//!     }
//!
//!     fn stdout(&mut self) -> impl std::io::Write {
//!         &mut self.stdout
//!     }
//!
//!     fn write_error(&mut self, err: run::Error) {
//!         eprintln!("{err}")
//!     }
//! }
//!
//! // Now, use it:
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let options = run::RunOptionsBuilder::default()
//!     .output(run::OutputFormat::Json)
//!     .build()?;
//!
//! let mut os_facade = MockIo::default();
//! let ok = run::run(&options, &mut os_facade);
//! let stdout_text = String::from_utf8(os_facade.stdout)?;
//!
//! assert!(ok);
//! assert!(stdout_text.starts_with(r#"{"roots":[{"list":"#));
//! #
//! #     Ok(())
//! # }
//! ```
mod cli;
mod run_main;

pub use cli::*;
pub use run_main::*;
