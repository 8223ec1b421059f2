pub mod broadcaster;
pub mod handler;

pub use broadcaster::{Broadcaster, LiveUpdate, Subscription};
pub use handler::ws_handler;
