pub mod auth;
pub mod authority;
pub mod ballot;
pub mod deadline;
pub mod identity;
pub mod ledger;
