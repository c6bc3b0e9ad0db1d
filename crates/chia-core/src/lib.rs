//! Building blocks shared by the chia-operator controllers.
//!
//! [`cluster::Cluster`] abstracts the apiserver, [`converge::converge`]
//! applies one desired child object, [`ledger::Ledger`] tracks which custom
//! resources are managed, and [`metrics::OperatorMetrics`] counts it all.

pub mod backoff;
pub mod cluster;
pub mod converge;
pub mod error;
pub mod events;
pub mod labels;
pub mod ledger;
pub mod metrics;
pub mod overrides;
pub mod ownership;
pub mod quantity;
#[cfg(any(test, feature = "test_support"))]
pub mod test_support;

pub use backoff::Backoff;
pub use cluster::{Cluster, ClusterObject, KubeCluster};
pub use converge::{converge, ensure_absent, ChildObject, Outcome};
pub use error::{Error, Result};
pub use events::{EventPublisher, KubeEventPublisher, NoopEventPublisher};
pub use ledger::Ledger;
pub use metrics::OperatorMetrics;
