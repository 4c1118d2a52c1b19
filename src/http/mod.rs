//! HTTP protocol layer module
//!
//! Response builders, cache validators and MIME detection shared by the
//! static file handler, the proxy and the admin API.

pub mod cache;
pub mod mime;
pub mod response;

pub use response::{
    build_304_response, build_404_response, build_405_response, build_413_response,
    build_500_response, build_file_response, build_options_response, build_redirect_response,
    build_status_response, build_text_response,
};
