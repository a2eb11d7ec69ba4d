//! Market-data and news adapters.

mod calendar;
mod csv_source;
mod news;
mod rate_limit;
mod twelve_data;

pub use calendar::{HttpNews, HttpNewsConfig, NO_MAJOR_NEWS};
pub use csv_source::{instrument_file_name, CsvDataSource};
pub use news::{NoNews, StaticNews, WeekendAware, WEEKEND_NOTICE};
pub use rate_limit::RateLimiter;
pub use twelve_data::{TwelveDataConfig, TwelveDataSource, DEFAULT_BASE_URL};
