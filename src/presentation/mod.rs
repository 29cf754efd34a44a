//! Presentation helpers for rendering cached site data.

pub mod views;
