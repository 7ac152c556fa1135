/*
 * Responsibility
 * - Router-level middleware entry points
 * - auth (bearer gate for /upload), http (request id / trace / body limit), cors, security headers
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
