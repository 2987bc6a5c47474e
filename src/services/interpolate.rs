//! Lap-level weather estimation.
//!
//! Hourly samples for the race day are spread over the race distance: lap 1
//! maps to hour 0 and the last lap to hour 23, whatever the actual start time
//! or race duration. Each weather field is interpolated independently.

/// Last hour of the day on the synthetic lap axis.
const LAST_HOUR: f64 = 23.0;

/// One hourly weather sample (missing source values already defaulted).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlySample {
    pub hour: u32,
    pub air_temp: f64,
    pub track_temp: f64,
    pub humidity: f64,
    pub wind_speed: f64,
}

/// Estimated weather for one lap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LapWeather {
    pub lap: u32,
    pub air_temp: f64,
    pub track_temp: f64,
    pub humidity: f64,
    pub wind_speed: f64,
}

/// `n` evenly spaced points over `[0, 23]`, both ends included.
///
/// `n == 1` gives `[0.0]`; `n == 0` gives an empty axis.
pub fn lap_axis(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let last = (n - 1) as f64;
            (0..n).map(|i| LAST_HOUR * i as f64 / last).collect()
        }
    }
}

/// Piecewise-linear interpolation of `x` against sorted anchors `xs`/`ys`.
///
/// Points outside the anchor range take the nearest end value. A point equal
/// to an anchor returns that anchor's value exactly.
pub fn interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let len = xs.len().min(ys.len());
    if len == 0 {
        return f64::NAN;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[len - 1] {
        return ys[len - 1];
    }

    // First anchor strictly greater than x; 1 <= hi < len given the guards
    let hi = xs[..len].partition_point(|&anchor| anchor <= x);
    let lo = hi - 1;
    if xs[lo] == x {
        return ys[lo];
    }
    let (x0, x1, y0, y1) = (xs[lo], xs[hi], ys[lo], ys[hi]);
    y0 + (y1 - y0) * ((x - x0) / (x1 - x0))
}

/// Spread the day's hourly samples over `total_laps` laps.
///
/// Returns exactly `total_laps` entries numbered `1..=total_laps`.
pub fn interpolate_lap_weather(samples: &[HourlySample], total_laps: u32) -> Vec<LapWeather> {
    let mut ordered: Vec<HourlySample> = samples.to_vec();
    ordered.sort_by_key(|s| s.hour);

    let hours: Vec<f64> = ordered.iter().map(|s| f64::from(s.hour)).collect();
    let field = |get: fn(&HourlySample) -> f64| -> Vec<f64> { ordered.iter().map(get).collect() };
    let air = field(|s| s.air_temp);
    let track = field(|s| s.track_temp);
    let humidity = field(|s| s.humidity);
    let wind = field(|s| s.wind_speed);

    lap_axis(total_laps as usize)
        .into_iter()
        .zip(1..=total_laps)
        .map(|(x, lap)| LapWeather {
            lap,
            air_temp: interp(x, &hours, &air),
            track_temp: interp(x, &hours, &track),
            humidity: interp(x, &hours, &humidity),
            wind_speed: interp(x, &hours, &wind),
        })
        .collect()
}
