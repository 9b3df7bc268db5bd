// src/lib.rs
//! Scheduling analytics and daily invoice composition for a delivery-driver
//! workforce: vehicle-type and rate card resolution, work streaks, rest-day
//! continuity checks, and the invoice draft composer.

pub mod analytics;
pub mod cells;
pub mod config;
pub mod continuity;
pub mod dates;
pub mod error;
pub mod integrity;
pub mod invoice;
pub mod memo;
pub mod models;
pub mod rate_card;
pub mod streaks;
pub mod submission;
pub mod vehicle_type;


pub use analytics::ScheduleAnalytics;
pub use cells::{cell_states, CellAdvisory, CellMap, CellState};
pub use config::EngineConfig;
pub use continuity::{compute_continuity, ContinuityClass, ContinuityEngine, ContinuityMap};
pub use error::{EngineError, EngineResult, InvoiceIssue};
pub use invoice::{
    ActorRole, AdditionalServiceDetail, ApprovalStatus, DeductionLine, IncentiveLine, InvoiceDraft,
};
pub use models::{
    DeductionRecord, Driver, DriverId, IncentiveRecord, RateCard, ScheduleEntry, Snapshot,
    TypeTrace, VehicleType,
};
pub use rate_card::{find_rate_card, find_rate_card_for_date, RateCardLookup};
pub use streaks::{compute_streaks, StreakMap};
pub use submission::{InvoiceStore, MemoryInvoiceStore, SubmittedInvoice};
pub use vehicle_type::resolve_vehicle_type;
