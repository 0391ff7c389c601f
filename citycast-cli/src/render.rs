use citycast_core::{CitySuggestion, ForecastBundle, ForecastState, ViewState};
use std::fmt::Write;

pub fn render_state(view: &ViewState) -> String {
    match &view.forecast {
        ForecastState::Loading => "Loading forecast...\n".to_string(),
        ForecastState::Ready(bundle) => render_forecast(bundle),
        ForecastState::Failed(f) => {
            format!("Could not load the forecast for {}.\n  {}\n", f.city, f.message)
        }
    }
}

pub fn render_forecast(bundle: &ForecastBundle) -> String {
    let loc = &bundle.location;
    let cur = &bundle.current;

    let mut out = format!("{}, {}\n", loc.name, loc.country);
    if let Some(localtime) = &loc.localtime {
        let _ = writeln!(out, "Local time: {localtime}");
    }

    let _ = writeln!(out, "\n  {:.1}\u{00b0}C  {}", cur.temp_c, cur.condition_text);
    let _ = writeln!(out, "  Feels like {:.1}\u{00b0}C", cur.feels_like_c);
    let _ = write!(out, "  Wind {:.1} km/h  Humidity {}%", cur.wind_kph, cur.humidity_pct);
    if let Some(sunrise) = bundle.today_sunrise() {
        let _ = write!(out, "  Sunrise {sunrise}");
    }
    out.push('\n');

    let _ = writeln!(out, "\n{}-Day forecast", bundle.forecast_days.len());
    for day in &bundle.forecast_days {
        let _ = writeln!(
            out,
            "  {:<10} {:>5.1}\u{00b0}C  {}",
            day.date.format("%A").to_string(),
            day.avg_temp_c,
            day.condition_text
        );
    }

    out
}

pub fn render_suggestions(suggestions: &[CitySuggestion]) -> String {
    let mut out = String::new();
    for s in suggestions {
        match &s.region {
            Some(region) => {
                let _ = writeln!(out, "  {} ({})", s.label(), region);
            }
            None => {
                let _ = writeln!(out, "  {}", s.label());
            }
        }
    }
    out
}
