pub mod backend;
pub mod dao;
pub mod models;
pub mod schema;
