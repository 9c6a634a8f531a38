/// Pipeline instrumentation
/// Stage call counters, compiled to no-ops unless the profiling feature is on
pub mod profiling;

pub use profiling::{CounterSnapshot, FunctionCounters, FUNCTION_COUNTERS};
