//! Channel and video collection with country tagging.
//!
//! [`Collector`] sequences the ingestion workflows over two seams:
//! [`VideoGateway`] (the upstream platform, implemented for
//! `travelmap_youtube::YouTubeClient`) and [`CollectorStore`] (persistence,
//! implemented by [`PgStore`]).

pub mod collector;
pub mod dispatch;
pub mod error;
pub mod gateway;
mod progress;
pub mod reconcile;
pub mod report;
pub mod store;

pub use collector::{Collector, CollectorSettings, NewChannelOptions};
pub use dispatch::{DetectionJob, DispatchMode, Dispatcher};
pub use error::{CollectError, GatewayError, StoreError};
pub use gateway::VideoGateway;
pub use progress::CollectionStatus;
pub use reconcile::{plan, Reconciler, TagAction};
pub use report::{BatchReport, ChannelReport, SkippedItem};
pub use store::{CollectorStore, PgStore, RunType, TriggerSource};
