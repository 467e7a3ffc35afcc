//! # breakline-core
//!
//! Foundation types shared by every breakline crate:
//!
//! - **Document model**: [`dom::Document`], an arena tree of element and text
//!   nodes with HTML import/export and structural mutation recording
//! - **Selectors**: [`selector::SelectorList`], CSS selectors (scraper's
//!   grammar) matched against arena elements to locate scopes and
//!   edit-session elements
//! - **Errors**: [`errors::DomError`] and [`errors::SelectorError`]
//! - **Logging**: `tracing` subscriber setup and a capture layer for tests

#![deny(unsafe_code)]

pub mod dom;
pub mod errors;
pub mod logging;
pub mod selector;

pub use dom::{Document, MutationRecord, NodeId};
pub use errors::{DomError, SelectorError};
pub use selector::{ElementHandle, Selector, SelectorList};
