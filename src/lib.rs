/// climate_service: read-only JSON API over a climate-observation dataset.
///
/// # Module structure
///
/// ```text
/// climate_service
/// ├── model    - typed records (DailyObservation, Station) and TemperatureStats
/// ├── config   - service configuration loader (climate.toml + env overrides)
/// ├── db       - read-only SQLite access, schema checks, shared Store handle
/// ├── queries  - the fixed queries behind each route, ISO date parsing
/// └── endpoint - routing, handlers and the HTTP server loop
/// ```

/// Public modules
pub mod config;
pub mod db;
pub mod endpoint;
pub mod model;
pub mod queries;
