use chrono::{DateTime, Local};
use weatherapp_core::{FetchState, WeatherRecord};

/// Text shown for `state`. Idle renders as nothing.
pub fn render(state: &FetchState, now: DateTime<Local>) -> String {
    match state {
        FetchState::Idle => String::new(),
        FetchState::Loading => "Loading weather...".to_string(),
        FetchState::Success(record) => render_record(record, now),
        FetchState::Error(message) => message.clone(),
    }
}

fn render_record(record: &WeatherRecord, now: DateTime<Local>) -> String {
    let current = &record.current;
    let mut lines = vec![record.location.name.clone()];

    let subtitle = record.location.subtitle();
    if !subtitle.is_empty() {
        lines.push(subtitle);
    }

    lines.push(String::new());
    lines.push(format!("  {}°C  (feels like {}°C)", current.temp_c, current.feelslike_c));
    lines.push(format!("  {}", current.condition.text));
    lines.push(format!("  {}", current.condition.icon_url()));
    lines.push(String::new());

    let metrics = record.metrics();
    let width = metrics.iter().map(|m| m.label.len()).max().unwrap_or(0);
    for metric in metrics {
        lines.push(format!("  {:<width$}  {}", metric.label, metric.value));
    }

    lines.push(String::new());
    lines.push(format!("Updated at {}", now.format("%H:%M:%S")));
    lines.join("\n")
}
