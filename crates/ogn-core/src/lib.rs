pub mod domain;
pub mod error;
pub mod ids;
pub mod time;

pub use domain::{
    AircraftFix, AircraftType, ClimbTrend, DeviceTypes, Receiver, Station, StationStatus, Units,
};
pub use error::{ErrorCode, OgnError, OgnResult};
pub use ids::{AircraftKey, FlarmId, ReceiverName, StationName};
pub use time::{DatePreset, DateRange};
