//! Integration tests for the crawler
//!
//! `coordinator_tests` drive the coordinator against a scripted in-memory
//! catalog; `http_tests` crawl a wiremock server end-to-end.

mod common;
mod coordinator_tests;
mod http_tests;
