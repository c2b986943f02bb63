//! Event adapters implementing the `EventPublisher`/`EventSubscriber` ports.

mod fanout;
mod in_memory;
mod redis_publisher;

pub use fanout::FanoutPublisher;
pub use in_memory::InMemoryEventBus;
pub use redis_publisher::RedisEventPublisher;
