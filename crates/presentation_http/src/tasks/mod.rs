//! Background tasks for the HTTP presentation layer

mod cache_eviction;

pub use cache_eviction::spawn_cache_eviction_task;
