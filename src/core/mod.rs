//! Core business logic for the tuition portal.
//!
//! Everything here is framework-agnostic: plain async functions over a sea-orm connection that
//! return [`crate::errors::Result`]. The HTTP layer in `crate::api` only parses requests and
//! renders what these functions return.

pub mod assessment;
pub mod catalog;
pub mod class;
pub mod department;
pub mod documents;
pub mod fee_structure;
pub mod invoice;
pub mod money;
pub mod notification;
pub mod notify;
pub mod paging;
pub mod payment;
pub mod reconcile;
pub mod report;
pub mod semester;
pub mod student;
