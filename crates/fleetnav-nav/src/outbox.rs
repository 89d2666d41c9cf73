//! Outbound side of an agent.
//!
//! Agents never touch the transport directly.  Each one holds an
//! `Arc<dyn Outbox>` handed in at construction and pushes requests, reports
//! and snapshots through it.  Every send is fire-and-forget.

use fleetnav_types::{ObstacleReport, PathRequest, TrackingSnapshot};

/// Sink for everything an agent publishes.
pub trait Outbox: Send + Sync {
    /// Forward a planning request to the path planning service.
    fn request_path(&self, request: PathRequest);

    /// Forward an obstacle report to the obstacle manager.
    fn report_obstacle(&self, report: ObstacleReport);

    /// Push a tracking snapshot to the fleet manager.
    fn publish_tracking(&self, snapshot: TrackingSnapshot);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records every outbound message for assertions.
    #[derive(Default)]
    pub(crate) struct RecordingOutbox {
        pub requests: Mutex<Vec<PathRequest>>,
        pub reports: Mutex<Vec<ObstacleReport>>,
        pub snapshots: Mutex<Vec<TrackingSnapshot>>,
    }

    impl RecordingOutbox {
        pub fn requests(&self) -> Vec<PathRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn reports(&self) -> Vec<ObstacleReport> {
            self.reports.lock().unwrap().clone()
        }

        pub fn snapshots(&self) -> Vec<TrackingSnapshot> {
            self.snapshots.lock().unwrap().clone()
        }
    }

    impl Outbox for RecordingOutbox {
        fn request_path(&self, request: PathRequest) {
            self.requests.lock().unwrap().push(request);
        }

        fn report_obstacle(&self, report: ObstacleReport) {
            self.reports.lock().unwrap().push(report);
        }

        fn publish_tracking(&self, snapshot: TrackingSnapshot) {
            self.snapshots.lock().unwrap().push(snapshot);
        }
    }
}
