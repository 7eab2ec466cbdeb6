pub mod logging;
pub mod trace_context;

pub use logging::{REDACTED, init_tracing};
pub use trace_context::{
    TRACEPARENT_HEADER, TRACESTATE_HEADER, current_traceparent, inject_trace_context,
};
