mod bindings;

pub use bindings::{PyProcessor, PyStreamingDecoder};
