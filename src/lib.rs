//! Read-assembly and SNV discovery/annotation pipeline core.
//!
//! Two subsystems make up the hard engineering here: the SNV discovery and
//! annotation engine (pileup -> variants -> annotations -> filters) and the
//! alignment-result filter pipeline (parsers -> lazy mapper/predicate stream).
//! Both are described in detail in `SPEC_FULL.md`.

pub mod alignment;
pub mod context;
pub mod err;
pub mod model;
pub mod pileup;
pub mod reference;
pub mod restriction;
pub mod snv;
