//! Adapters for the services the order workflows talk to over the network.

pub mod payment;
pub mod publisher;
pub mod scheduler;
pub mod session;

pub use payment::{MidtransClient, PaymentGateway};
pub use publisher::{EventPublisher, RedisStreamPublisher};
pub use scheduler::{DurableHttpScheduler, RedisTaskStore, TaskScheduler};
pub use session::{RedisSessionStore, SessionStore};
