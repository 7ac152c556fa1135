/*
 * Responsibility
 * - HTTP surface: routes, handlers, extractors
 */
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::routes;
