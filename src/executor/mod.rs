mod executor_impl;

pub use executor_impl::{ExecutionError, ExecutorCreationError, ProbeExecutor, ProbeReport};
