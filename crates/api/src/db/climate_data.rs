use async_trait::async_trait;
use duckdb::{
    arrow::array::{Array, Float64Array, RecordBatch, StringArray},
    params_from_iter, Connection,
};
use regex::Regex;
use scooby::postgres::{select, Aliasable, Parameters, Select};
use serde::{Deserialize, Serialize};
use time::{
    format_description::FormatItem,
    macros::format_description,
    Date,
};
use utoipa::ToSchema;

/// Calendar-date format used throughout the dataset. ISO dates stored as
/// VARCHAR compare lexicographically in chronological order, which is what
/// the range filters rely on.
pub const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to query duckdb: {0}")]
    Query(#[from] duckdb::Error),
    #[error("Failed to format time string: {0}")]
    TimeFormat(#[from] time::error::Format),
}

/// Inclusive date bounds plus an optional station restriction, applied to
/// every observation scan. An absent `end` leaves the range unbounded above.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationFilter {
    pub start: Date,
    pub end: Option<Date>,
    pub station: Option<String>,
}

#[async_trait]
pub trait ClimateData: Send + Sync {
    /// Ordered (date, precipitation) pairs for the matching observations
    async fn precipitation(
        &self,
        filter: &ObservationFilter,
    ) -> Result<Vec<PrecipitationReading>, Error>;
    /// Ordered (date, temperature) pairs for the matching observations
    async fn temperature(
        &self,
        filter: &ObservationFilter,
    ) -> Result<Vec<TemperatureReading>, Error>;
    /// Three-way min/avg/max reduction of the temperature field over the
    /// matching observations; all fields null when nothing matches
    async fn temperature_stats(
        &self,
        filter: &ObservationFilter,
    ) -> Result<TemperatureStats, Error>;
    async fn stations(&self) -> Result<Vec<Station>, Error>;
}

pub struct ClimateAccess {
    data_dir: String,
}

impl ClimateAccess {
    pub fn new(data_dir: String) -> Self {
        Self { data_dir }
    }

    fn observations_path(&self) -> String {
        format!("{}/observations.parquet", self.data_dir)
    }

    fn stations_path(&self) -> String {
        format!("{}/stations.parquet", self.data_dir)
    }

    /// Creates a new in-memory connection per query, making it so we always
    /// start with a fresh slate and no possible locking issues
    fn open_connection(&self) -> Result<Connection, duckdb::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("INSTALL parquet; LOAD parquet;")?;
        Ok(conn)
    }

    async fn query(
        &self,
        select: Select,
        params: Vec<String>,
    ) -> Result<Vec<RecordBatch>, duckdb::Error> {
        let re = Regex::new(r"\$(\d+)").unwrap();
        let binding = select.to_string();
        let fixed_params = re.replace_all(&binding, "?");
        let conn = self.open_connection()?;
        let mut stmt = conn.prepare(&fixed_params)?;
        let sql_params = params_from_iter(params.iter());
        Ok(stmt.query_arrow(sql_params)?.collect())
    }

    fn observation_scan(
        &self,
        columns: (&str, &str),
        filter: &ObservationFilter,
    ) -> Result<(Select, Vec<String>), Error> {
        let mut placeholders = Parameters::new();
        let mut values: Vec<String> = vec![];

        let mut query = select(columns).from(format!(
            "read_parquet('{}')",
            self.observations_path()
        ));

        if let Some(station) = &filter.station {
            query = query.where_(format!("station = {}", placeholders.next()));
            values.push(station.clone());
        }

        query = query.where_(format!("date >= {}", placeholders.next()));
        values.push(filter.start.format(ISO_DATE)?);

        if let Some(end) = &filter.end {
            query = query.where_(format!("date <= {}", placeholders.next()));
            values.push(end.format(ISO_DATE)?);
        }

        Ok((query, values))
    }
}

#[async_trait]
impl ClimateData for ClimateAccess {
    async fn precipitation(
        &self,
        filter: &ObservationFilter,
    ) -> Result<Vec<PrecipitationReading>, Error> {
        let (query, values) = self.observation_scan(("date", "precipitation"), filter)?;
        let records = self.query(query.order_by("date"), values).await?;
        Ok(records.iter().flat_map(precipitation_rows).collect())
    }

    async fn temperature(
        &self,
        filter: &ObservationFilter,
    ) -> Result<Vec<TemperatureReading>, Error> {
        let (query, values) = self.observation_scan(("date", "temperature"), filter)?;
        let records = self.query(query.order_by("date"), values).await?;
        Ok(records.iter().flat_map(temperature_rows).collect())
    }

    async fn temperature_stats(
        &self,
        filter: &ObservationFilter,
    ) -> Result<TemperatureStats, Error> {
        let mut placeholders = Parameters::new();
        let mut values: Vec<String> = vec![];

        let mut query = select((
            "MIN(temperature)".as_("tmin"),
            "AVG(temperature)".as_("tavg"),
            "MAX(temperature)".as_("tmax"),
        ))
        .from(format!(
            "read_parquet('{}')",
            self.observations_path()
        ));

        if let Some(station) = &filter.station {
            query = query.where_(format!("station = {}", placeholders.next()));
            values.push(station.clone());
        }

        query = query.where_(format!("date >= {}", placeholders.next()));
        values.push(filter.start.format(ISO_DATE)?);

        if let Some(end) = &filter.end {
            query = query.where_(format!("date <= {}", placeholders.next()));
            values.push(end.format(ISO_DATE)?);
        }

        let records = self.query(query, values).await?;
        Ok(stats_row(&records))
    }

    async fn stations(&self) -> Result<Vec<Station>, Error> {
        let query = select(("station", "name", "latitude", "longitude", "elevation"))
            .from(format!("read_parquet('{}')", self.stations_path()))
            .order_by("station");

        let records = self.query(query, vec![]).await?;
        Ok(records.iter().flat_map(station_rows).collect())
    }
}

fn precipitation_rows(record_batch: &RecordBatch) -> Vec<PrecipitationReading> {
    let date_arr = record_batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("Expected StringArray in column 0");
    let precipitation_arr = record_batch
        .column(1)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Expected Float64Array in column 1");

    let mut readings = Vec::with_capacity(record_batch.num_rows());
    for row_index in 0..record_batch.num_rows() {
        // precipitation is nullable in the source data, missing gauge readings
        let precipitation = if precipitation_arr.is_null(row_index) {
            None
        } else {
            Some(precipitation_arr.value(row_index))
        };
        readings.push(PrecipitationReading {
            date: date_arr.value(row_index).to_owned(),
            precipitation,
        });
    }
    readings
}

fn temperature_rows(record_batch: &RecordBatch) -> Vec<TemperatureReading> {
    let date_arr = record_batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("Expected StringArray in column 0");
    let temperature_arr = record_batch
        .column(1)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Expected Float64Array in column 1");

    let mut readings = Vec::with_capacity(record_batch.num_rows());
    for row_index in 0..record_batch.num_rows() {
        readings.push(TemperatureReading {
            date: date_arr.value(row_index).to_owned(),
            temperature: temperature_arr.value(row_index),
        });
    }
    readings
}

fn station_rows(record_batch: &RecordBatch) -> Vec<Station> {
    let station_arr = record_batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("Expected StringArray in column 0");
    let name_arr = record_batch
        .column(1)
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("Expected StringArray in column 1");
    let latitude_arr = record_batch
        .column(2)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Expected Float64Array in column 2");
    let longitude_arr = record_batch
        .column(3)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Expected Float64Array in column 3");
    let elevation_arr = record_batch
        .column(4)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Expected Float64Array in column 4");

    let mut stations = Vec::with_capacity(record_batch.num_rows());
    for row_index in 0..record_batch.num_rows() {
        let elevation = if elevation_arr.is_null(row_index) {
            None
        } else {
            Some(elevation_arr.value(row_index))
        };
        stations.push(Station {
            station: station_arr.value(row_index).to_owned(),
            name: name_arr.value(row_index).to_owned(),
            latitude: latitude_arr.value(row_index),
            longitude: longitude_arr.value(row_index),
            elevation,
        });
    }
    stations
}

/// An aggregate over zero rows comes back as a single all-NULL row, which
/// maps onto the all-None stats value.
fn stats_row(records: &[RecordBatch]) -> TemperatureStats {
    let Some(record_batch) = records.iter().find(|r| r.num_rows() > 0) else {
        return TemperatureStats::default();
    };

    let tmin_arr = record_batch
        .column(0)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Expected Float64Array in column 0");
    let tavg_arr = record_batch
        .column(1)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Expected Float64Array in column 1");
    let tmax_arr = record_batch
        .column(2)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Expected Float64Array in column 2");

    TemperatureStats {
        min: (!tmin_arr.is_null(0)).then(|| tmin_arr.value(0)),
        avg: (!tavg_arr.is_null(0)).then(|| tavg_arr.value(0)),
        max: (!tmax_arr.is_null(0)).then(|| tmax_arr.value(0)),
    }
}

/// One precipitation observation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct PrecipitationReading {
    pub date: String,
    /// Rainfall in inches, null where the gauge reported nothing
    pub precipitation: Option<f64>,
}

/// One temperature observation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct TemperatureReading {
    pub date: String,
    /// Degrees Fahrenheit
    pub temperature: f64,
}

/// Raw min/avg/max reduction as produced by the store, before any rounding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemperatureStats {
    pub min: Option<f64>,
    pub avg: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Station {
    pub station: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
}
