//! # classmatch
//!
//! A two-sided bytecode matcher core. Given two versions of the same
//! program whose symbols were destroyed by obfuscation, classmatch pairs
//! classes with classes, methods with methods, fields with fields, and
//! per-method args/locals with their counterparts, so a mapping emitter
//! can carry names from one build to the other.
//!
//! The crate is the matching engine only: an entity graph with match
//! links and hierarchy sets, weighted classifiers that score candidate
//! pairings, a ranker that accepts clear winners, an arbiter that commits
//! them under hard invariants, and an iterative driver that runs scoring
//! passes in parallel until a fixed point. Loading class artifacts and
//! reading/writing mapping files are the embedder's job.
//!
//! ## Quick start
//!
//! ```
//! use classmatch::graph::{ClassDecl, GraphBuilder, MethodDecl, Side};
//! use classmatch::matching::Matcher;
//! use classmatch::parallel::no_progress;
//!
//! let mut builder = GraphBuilder::new();
//! builder.class(
//!     Side::A,
//!     ClassDecl::new("a").obfuscated().method(MethodDecl::new("m", "()V").obfuscated()),
//! );
//! builder.class(
//!     Side::B,
//!     ClassDecl::new("b").obfuscated().method(MethodDecl::new("n", "()V").obfuscated()),
//! );
//!
//! let mut matcher = Matcher::new(builder.build()?);
//! matcher.match_unobfuscated()?;
//! matcher.auto_match_all(no_progress())?;
//!
//! let status = matcher.status(true);
//! println!("{}/{} classes matched", status.matched_class_count, status.total_class_count);
//! # Ok::<(), classmatch::Error>(())
//! ```
//!
//! ## Concurrency model
//!
//! Each automatic pass has two phases: parallel scoring (pure reads of
//! the graph, writes only to the concurrent classifier cache) and a
//! serial commit on the driver thread. Match links never mutate while a
//! scorer is running.

pub mod cache;
pub mod classifier;
pub mod config;
pub mod errors;
pub mod graph;
pub mod matching;
pub mod parallel;

pub use crate::classifier::Level;
pub use crate::config::MatcherConfig;
pub use crate::errors::{Error, Result};
pub use crate::graph::MatchEnv;
pub use crate::matching::{Matcher, MatchingStatus};
