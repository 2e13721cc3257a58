//! Product-finder service over a retail transactions catalog, plus a radio
//! content API.
pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
