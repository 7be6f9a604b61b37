pub mod capture;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod display;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod model;
pub mod store;
pub mod wire;

pub use capture::{compose_capture, parse_capture, CaptureInput};
pub use config::AppConfig;
pub use controller::{Controller, Notice, NoticeKind, RefreshOutcome, RefreshTicket, StatsTicket};
pub use debounce::{debounce, Debouncer};
pub use display::{BadgeInfo, Tone};
pub use error::{CaptureError, ControllerError, GatewayError, GatewayOp};
pub use gateway::{GatewayResult, HttpGateway, MemoryGateway, TaskGateway};
pub use model::*;
pub use store::StateStore;
