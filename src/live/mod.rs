//! Live Collection Views
//!
//! Real-time synchronized renderings of record collections.
//!
//! ## Architecture
//!
//! - **LiveCollectionView**: one task per view draining its subscription
//! - **LocalMirror**: the view's ordered, wholesale-replaced cache
//! - **Subscription**: lifecycle handle; cancel or drop to tear down
//!
//! ```text
//! RecordStore ──snapshot──▶ view task ──▶ mirror ──▶ renderer ──▶ listeners
//! ```

mod mirror;
mod view;

pub use mirror::LocalMirror;
pub(crate) use mirror::{lock, read, write};
pub use view::{
    LiveCollectionView, Subscription, ViewListener, ViewRenderer, ViewStatus, ViewUpdate,
};
