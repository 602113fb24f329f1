pub mod channels;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod replies;
pub mod routes;
pub mod state;
pub mod timeline;
pub mod tokens;
