//! Integration tests for the anchor → reconcile → redline pipeline.

mod payloads;
mod redline_flow;
mod scenarios;
