//! Request handler module
//!
//! Host rewriting and route dispatch for the public listener: static
//! directories and files, redirects and reverse proxying.

pub mod proxy;
pub mod router;
pub mod static_files;

pub use router::handle_request;
