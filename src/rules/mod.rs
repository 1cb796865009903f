//! Rule markup loading and merging.
//!
//! Rules arrive as XML rule sets. Each element either creates, replaces,
//! alters or deletes a rule in the [`Ruleset`](crate::kinds::Ruleset), so a
//! base rule set can be patched by later files without repeating it.
//!
//! ## Key Types
//!
//! - [`RuleLoader`]: Parses markup into a ruleset, all or nothing
//! - [`RuleSource`]: Raw text or a pre-parsed document
//! - [`ParseReport`]: Counts of what a parse changed
//! - [`MergeMode`]: Replace, alter or delete
//! - [`RuleIdentity`]: How a rule finds the item it merges into

pub mod markup;
pub mod merge;
pub mod parser;
pub mod schema;

pub use merge::{merge_rule, merge_slot, MergeMode, MergeOutcome, RuleIdentity};
pub use parser::{ParseReport, RuleLoader, RuleSource};
pub use schema::Element;
