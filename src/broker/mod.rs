//! The broker: topic registry plus message router.
//!
//! - `TopicRegistry` tracks which connections subscribe to which topic.
//! - `Broker` owns the registry and every connected `Client`, and applies
//!   subscribe, unsubscribe, publish and ping on behalf of a connection.
//!
//! The broker is the only shared mutable state in the relay. It is held
//! behind `SharedBroker` and every operation finishes under a single lock.

pub mod engine;
pub mod registry;
pub mod topic;

pub use engine::{Broker, DeliveryPolicy, SharedBroker, lock};
pub use registry::TopicRegistry;
pub use topic::Topic;
