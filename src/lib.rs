//! Host-based router for the mindefy.tech product portfolio
//!
//! Requests arriving on a product hostname are rewritten into that product's
//! path namespace before they reach the route table, so one deployment serves
//! `portfolio.mindefy.tech`, `ask.mindefy.tech` and
//! `movie-recommendation.mindefy.tech` while keeping each product's pages under
//! `/portfolio`, `/askdocs` and `/movies`.

pub mod api;
pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;
