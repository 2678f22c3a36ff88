//! Concrete ordered test cases, one module per target
pub mod api;
pub mod mobile;
pub mod web;
