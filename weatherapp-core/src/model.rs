use serde::{Deserialize, Serialize};

/// Current conditions for one location, as returned by the provider's
/// `current.json` endpoint. Fields the provider sends beyond these are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub location: Location,
    pub current: Current,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub region: String,
    pub country: String,
}

impl Location {
    /// "Region, Country", skipping parts the provider left empty.
    pub fn subtitle(&self) -> String {
        [self.region.as_str(), self.country.as_str()]
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Current {
    pub temp_c: f64,
    pub feelslike_c: f64,
    pub condition: Condition,
    pub wind_kph: f64,
    pub humidity: u8,
    pub pressure_mb: f64,
    pub uv: f64,
    pub vis_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub text: String,
    pub icon: String,
}

impl Condition {
    /// Icon URLs come back protocol-relative (`//cdn.weatherapi.com/...`).
    pub fn icon_url(&self) -> String {
        if self.icon.starts_with("//") {
            format!("https:{}", self.icon)
        } else {
            self.icon.clone()
        }
    }
}

/// One labelled detail row (wind, humidity, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub label: &'static str,
    pub value: String,
}

impl WeatherRecord {
    pub fn metrics(&self) -> Vec<Metric> {
        let c = &self.current;
        vec![
            Metric { label: "Wind", value: format!("{} km/h", c.wind_kph) },
            Metric { label: "Humidity", value: format!("{}%", c.humidity) },
            Metric { label: "Pressure", value: format!("{} mb", c.pressure_mb) },
            Metric { label: "UV Index", value: format!("{}", c.uv) },
            Metric { label: "Visibility", value: format!("{} km", c.vis_km) },
        ]
    }
}
