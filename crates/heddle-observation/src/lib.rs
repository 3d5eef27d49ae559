#![forbid(unsafe_code)]

//! Observation core: subscriber records, change fan-out, and observers.
//!
//! # Role in Heddle
//! `heddle-observation` is the reactive spine. It owns the subscriber
//! collection machinery every observable entity embeds and the
//! change-notification protocol bindings consume: state mutates, the
//! owning observer computes the delta, and the observer's record fans the
//! change out to every registered subscriber.
//!
//! # Primary responsibilities
//! - **Subscriber records**: slot-based subscriber storage with scalar
//!   fan-out (re-entrancy-safe, queue-merged) and collection fan-out.
//! - **PropertyObserver / ArrayObserver**: scalar and collection
//!   observables built on those records.
//! - **IndexMap**: the delta description collection subscribers receive.
//! - **ChangeFlags**: opaque propagation context forwarded with every
//!   notification.
//!
//! # How it fits in the system
//! `heddle-binding` registers bindings as subscribers on these observers
//! and pushes values between source and view when notified. Everything is
//! single-threaded (`Rc`/`RefCell`); the only concurrency concern is
//! re-entrancy, which the record machinery absorbs.

pub mod array;
pub mod flags;
pub mod index_map;
pub mod property;
pub mod record;
pub mod subscriber;

pub use array::{ArrayObserver, CollectionLengthObserver};
pub use flags::ChangeFlags;
pub use index_map::IndexMap;
pub use property::PropertyObserver;
pub use record::{
    ChangeRecord, CollectionSubscriberRecord, MAX_NOTIFY_DEPTH, SubscriberRecord,
};
pub use subscriber::{
    CollectionSubscribable, CollectionSubscriber, Subscribable, Subscriber,
};
