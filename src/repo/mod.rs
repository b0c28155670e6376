//! PostgreSQL repository adapters.
//!
//! Each adapter resolves its executor per statement (ambient transaction or
//! pooled connection) and translates storage failures into the domain error
//! values of its entity.

pub mod companies;
pub mod employees;
pub mod users;
