//! Analytics proxy: GA4 reports reshaped for the dashboard, with zeroed fallbacks.

pub mod ga4;
pub mod service;
pub mod source;

pub use ga4::Ga4Client;
pub use service::{AnalyticsService, Report};
pub use source::*;
