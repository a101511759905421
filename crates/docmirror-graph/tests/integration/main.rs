//! Integration tests for docmirror-graph
//!
//! Uses wiremock to simulate the Microsoft Graph API and the identity
//! platform, and verifies end-to-end behavior of library resolution,
//! paginated listing, content download and sign-in.

mod common;

mod test_auth;
mod test_content;
mod test_library;
mod test_listing;
mod test_provider;
