pub mod alerts;
pub mod pipeline;
pub mod poller;
pub mod sink;

pub use alerts::{Alert, PerTickerThreshold, PriceAbove, ThresholdPolicy};
pub use pipeline::{AlertPipeline, PipelineStats};
pub use poller::{CycleStats, CycleStatus, Poller, PollerStats};
pub use sink::{run_sink, AlertSink, ChannelAlertSink, LogAlertSink};
