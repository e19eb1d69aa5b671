//! State controllers used by the browser client around the history and
//! classification flows. Transport-agnostic: the HTTP calls sit behind
//! traits so the controllers can be driven and tested without a server.

pub mod classifier;
pub mod optimistic;
