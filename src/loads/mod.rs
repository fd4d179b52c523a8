//! Load patterns, time series and load kinds

mod element_load;
mod nodal;
mod pattern;
mod time_series;

pub use element_load::ElementLoad;
pub use nodal::NodalLoad;
pub use pattern::LoadPattern;
pub use time_series::TimeSeries;
