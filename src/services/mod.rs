//! HTTP collaborators other than the chat transport.

pub mod analytics;
pub mod questions;

pub use analytics::{AnalyticsClient, AnalyticsError, AnalyticsEvent, AnalyticsSink, LeadCapture};
pub use questions::QuestionClient;
