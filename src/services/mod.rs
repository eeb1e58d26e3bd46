pub mod persistence;

pub use persistence::{FilterSink, JsonFileSink, MemorySink, PersistError, SaveTarget};
