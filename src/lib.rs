pub mod authentication;
pub mod cli;
mod client_ip;
mod cors;
mod database;
mod email;
mod http_err;
pub mod identities;
mod passwords;
mod rate_limit;
mod repos;
pub mod server;

#[cfg(test)]
mod testing;
