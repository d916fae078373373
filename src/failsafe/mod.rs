//! Failsafe mechanisms for remote calls

mod retry;

pub use retry::{RetryPolicy, with_retry};
