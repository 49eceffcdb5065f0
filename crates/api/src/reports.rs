use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::{macros::date, Date};
use utoipa::ToSchema;

use crate::db::{
    self, ClimateData, ObservationFilter, PrecipitationReading, TemperatureReading,
    TemperatureStats, ISO_DATE,
};

/// First day of the one-year reporting window used by the fixed endpoints
pub const WINDOW_START: Date = date!(2016 - 08 - 23);
/// Last day of observations in the dataset, and the end of the window
pub const WINDOW_END: Date = date!(2017 - 08 - 23);
/// Station with the highest observation count in the dataset. Derived
/// offline by ranking stations on rows per station; regenerate the ranking
/// if the dataset is ever replaced.
pub const MOST_ACTIVE_STATION: &str = "USC00519281";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid date '{input}', expected YYYY-MM-DD")]
    InvalidDate {
        input: String,
        #[source]
        source: time::error::Parse,
    },
    #[error("end date {end} is earlier than start date {start}")]
    InvertedRange { start: Date, end: Date },
    #[error("failed to query climate store: {0}")]
    Store(#[from] db::Error),
}

/// Validated caller-supplied date range. An absent `end` leaves the range
/// unbounded above, running through the latest date in the dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct DateRange {
    pub start: Date,
    pub end: Option<Date>,
}

impl DateRange {
    pub fn parse(start: &str, end: Option<&str>) -> Result<Self, Error> {
        let start_date = parse_date(start)?;
        let end_date = end.map(parse_date).transpose()?;

        if let Some(end_date) = end_date {
            if end_date < start_date {
                return Err(Error::InvertedRange {
                    start: start_date,
                    end: end_date,
                });
            }
        }

        Ok(Self {
            start: start_date,
            end: end_date,
        })
    }
}

fn parse_date(input: &str) -> Result<Date, Error> {
    Date::parse(input, ISO_DATE).map_err(|source| Error::InvalidDate {
        input: input.to_owned(),
        source,
    })
}

/// Min/avg/max temperature over a date range. All fields are null when the
/// range matched no observations.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct TemperatureSummary {
    #[serde(rename = "TMIN")]
    pub tmin: Option<f64>,
    /// Rounded to the nearest whole degree, ties away from zero
    #[serde(rename = "TAVG")]
    pub tavg: Option<f64>,
    #[serde(rename = "TMAX")]
    pub tmax: Option<f64>,
}

impl From<TemperatureStats> for TemperatureSummary {
    fn from(stats: TemperatureStats) -> Self {
        Self {
            tmin: stats.min,
            tavg: stats.avg.map(f64::round),
            tmax: stats.max,
        }
    }
}

/// Shapes climate query results for the boundary layer.
///
/// Holds the injected store handle; every call is a single stateless read
/// with no cross-call memory.
pub struct Reports {
    store: Arc<dyn ClimateData>,
    window_start: Date,
    window_end: Date,
    most_active_station: String,
}

impl Reports {
    pub fn new(store: Arc<dyn ClimateData>) -> Self {
        Self {
            store,
            window_start: WINDOW_START,
            window_end: WINDOW_END,
            most_active_station: MOST_ACTIVE_STATION.to_string(),
        }
    }

    /// Precipitation readings across all stations for the fixed window
    pub async fn precipitation(&self) -> Result<Vec<PrecipitationReading>, Error> {
        let filter = ObservationFilter {
            start: self.window_start,
            end: Some(self.window_end),
            station: None,
        };
        Ok(self.store.precipitation(&filter).await?)
    }

    /// Identifiers of every station in the dataset
    pub async fn stations(&self) -> Result<Vec<String>, Error> {
        let stations = self.store.stations().await?;
        Ok(stations.into_iter().map(|s| s.station).collect())
    }

    /// Temperature readings for the most active station over the fixed window
    pub async fn most_active_series(&self) -> Result<Vec<TemperatureReading>, Error> {
        let filter = ObservationFilter {
            start: self.window_start,
            end: Some(self.window_end),
            station: Some(self.most_active_station.clone()),
        };
        Ok(self.store.temperature(&filter).await?)
    }

    /// Min/avg/max temperature over `[start, end]`, or `[start, latest]`
    /// when no end date is given. Rejects malformed dates and inverted
    /// ranges before touching the store.
    pub async fn range_summary(
        &self,
        start: &str,
        end: Option<&str>,
    ) -> Result<TemperatureSummary, Error> {
        let range = DateRange::parse(start, end)?;
        let filter = ObservationFilter {
            start: range.start,
            end: range.end,
            station: None,
        };
        let stats = self.store.temperature_stats(&filter).await?;
        Ok(stats.into())
    }
}
