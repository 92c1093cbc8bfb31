pub mod backends;

pub use backends::memory::MemoryStore;
