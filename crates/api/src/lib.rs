pub mod db;
pub mod reports;
pub mod routes;
mod startup;
mod utils;

pub use db::{
    ClimateAccess, ClimateData, ObservationFilter, PrecipitationReading, Station,
    TemperatureReading, TemperatureStats,
};
pub use reports::{Reports, TemperatureSummary, MOST_ACTIVE_STATION, WINDOW_END, WINDOW_START};
pub use routes::*;
pub use startup::{app, build_app_state, AppState};
pub use utils::{get_config_info, get_log_level, setup_logger, Cli};
