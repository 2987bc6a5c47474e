pub mod duration;
pub mod ergast;
pub mod geocode;
pub mod interpolate;
pub mod join;
pub mod open_meteo;
pub mod pipeline;
pub mod pitstops;
pub mod throttle;
