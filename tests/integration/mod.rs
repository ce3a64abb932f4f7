//! Integration Tests Module
//!
//! End-to-end tests for the rule memory engine: saving rules from messages
//! and tools, injecting them into agent context, and model-assisted
//! extraction driven through `AppState` and the host protocol.

// Rule capture, storage and injection through the command layer
mod rule_flow_test;

// Extraction cycles against a scripted model provider
mod extraction_test;
