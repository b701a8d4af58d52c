//! 3D viewer: shape-file parsing, configuration and session state for the
//! `viewer3d` binary.
pub mod command;
pub mod config;
pub mod persistence;
pub mod render;
pub mod session;
pub mod shape;
