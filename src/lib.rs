//! Local mirror of a remote children's story feed with a favorite overlay.

pub mod config;
pub mod db;
pub mod feed;
pub mod html;
pub mod layout;
pub mod model;
pub mod store;
pub mod sync;
