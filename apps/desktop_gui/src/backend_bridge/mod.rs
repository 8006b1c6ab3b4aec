//! Backend bridge: command queue types and the worker thread that owns the session.

pub mod commands;
pub mod runtime;
