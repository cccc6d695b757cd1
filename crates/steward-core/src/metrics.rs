//! Metric name constants.
//!
//! Metrics are recorded from several crates but rendered by one endpoint;
//! the names live here so every recorder and every dashboard query agrees.

/// Active graph runs (gauge).
pub const AGENT_RUNS_ACTIVE: &str = "agent_runs_active";
/// Active workers (gauge).
pub const WORKERS_ACTIVE: &str = "workers_active";
/// Event publishes with no live subscriber (counter).
pub const EVENTS_PUBLISH_DROPS_TOTAL: &str = "events_publish_drops_total";
/// Graph stage executions (counter, labels: node).
pub const GRAPH_STAGES_TOTAL: &str = "graph_stages_total";
/// Graph stage failures (counter, labels: node).
pub const GRAPH_STAGE_FAILURES_TOTAL: &str = "graph_stage_failures_total";
/// Runs terminated by the iteration cap (counter).
pub const GRAPH_CAP_TERMINATIONS_TOTAL: &str = "graph_cap_terminations_total";
