//! Integration tests for projsync-api
//!
//! Uses wiremock to simulate the remote document store and verifies request
//! shape, response parsing and error mapping of the client and the port
//! implementation.

mod common;

mod test_documents;
mod test_projects;
