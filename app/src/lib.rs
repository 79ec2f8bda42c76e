//! Fake shell commands for integration tests.
//!
//! `shmock` writes throwaway executables into a temp dir and puts that dir in
//! front of `PATH`, so code under test that runs `git`, `grep` or any other
//! command gets scripted answers instead, without being changed.
//!
//! ```no_run
//! use shmock::{BehaviorSpec, MockSpec, PartialReaction, ShellCommandMock};
//!
//! let spec = MockSpec::new()
//!     .command("saynay", "Nay sayers say nay.")
//!     .command(
//!         "git",
//!         BehaviorSpec::table()
//!             .when(["rev-parse", "HEAD"], "0123abcd")
//!             .when("push", PartialReaction::new().stderr("rejected").returncode(1)),
//!     );
//!
//! let session = ShellCommandMock::new(spec).activate()?;
//! let out = shmock::invoke::call("git", ["rev-parse", "HEAD"])?;
//! assert_eq!(out.stdout, "0123abcd\n");
//! drop(session); // PATH restored, temp dir removed
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Only one session can be active per process at a time; see [`mock`].

pub mod behavior;
pub mod config;
pub mod error;
pub mod invoke;
pub mod logging;
pub mod mock;
pub mod path_env;
pub mod script;

pub use crate::behavior::{
    normalize_behavior, ArgKey, ArgsSpec, BehaviorSpec, MockSpec, NormalizedBehavior,
    PartialReaction, Reaction, ReactionSpec, NOT_MOCKED,
};
pub use crate::error::{MockError, Result};
pub use crate::mock::{with_mocks, MockSession, ShellCommandMock};
