//! Router Module Index
//!
//! Groups the pages by the viewers they are meant for. Access is not enforced by these
//! routers: every page declares its restriction to the shared layout, which redirects
//! or renders accordingly.

/// Pages and endpoints for everyone, including the session endpoints.
pub mod public;

/// Pages that send anonymous viewers to the login page.
pub mod authenticated;

/// Admin pages, nested under `/admin`. Non-admin viewers are sent home.
pub mod admin;
