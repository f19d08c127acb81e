//! Client for the asynchronous prediction service.
//!
//! Provides the wire types, a [`reqwest`]-based REST client for job
//! submission and status retrieval, the [`service::JobService`] seam used
//! by the pipeline, and the [`poller`] that drives a single job to a
//! terminal state.

pub mod api;
pub mod messages;
pub mod poller;
pub mod service;
