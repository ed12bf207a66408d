// ABOUTME: front-door helpers for the warden binary: command extraction from
// ABOUTME: free-form model output and transcript rendering of result envelopes.

pub mod parser;
pub mod render;
