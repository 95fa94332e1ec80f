// Library for tests to access modules

pub mod config;
pub mod docker_repo;
pub mod models;
pub mod ports;
pub mod routes;
pub mod validator;
pub mod version;
pub mod worker;
