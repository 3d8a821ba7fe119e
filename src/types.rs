use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One row of the license CSV as exported upstream. Everything is optional
/// at this stage; the loader decides what is usable.
#[derive(Debug, Deserialize)]
pub struct RawLicenseRow {
    #[serde(rename = "Ref")]
    pub reference: Option<String>,
    #[serde(rename = "Frecuencia")]
    pub frequency: Option<String>,
    #[serde(rename = "FCaducidad")]
    pub expiration_date: Option<String>,
    #[serde(rename = "Provincia_FREQ")]
    pub province: Option<String>,
    #[serde(rename = "Municipio")]
    pub municipality: Option<String>,
    #[serde(rename = "Titular")]
    pub holder_name: Option<String>,
    #[serde(rename = "NIF/CIF")]
    pub holder_tax_id: Option<String>,
}

/// One row of the province coordinate CSV.
#[derive(Debug, Deserialize)]
pub struct RawProvinceRow {
    #[serde(rename = "provincias")]
    pub province: Option<String>,
    #[serde(rename = "lat")]
    pub lat: Option<String>,
    #[serde(rename = "long")]
    pub lon: Option<String>,
}

/// A cleaned license record. `days_remaining` is derived at load time
/// against the date injected into the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct LicenseRecord {
    pub reference: String,
    pub frequency: f64,
    pub expiration_date: NaiveDate,
    pub days_remaining: i64,
    pub province: String,
    pub municipality: String,
    pub holder_name: String,
    pub holder_tax_id: String,
}

/// The loaded dataset plus the load-time snapshots the filter controls are
/// seeded from. Immutable after load; queries borrow, never mutate.
#[derive(Debug)]
pub struct Dataset {
    pub records: Vec<LicenseRecord>,
    pub min_freq: f64,
    pub max_freq: f64,
    pub min_days: i64,
    pub max_days: i64,
    pub provinces: Vec<String>,
    pub municipalities: Vec<String>,
    pub holders: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Kpis {
    pub record_count: usize,
    pub company_count: usize,
    pub avg_per_company: i64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq, Eq)]
pub struct OwnerRankingRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Holder")]
    #[tabled(rename = "Holder")]
    pub holder_name: String,
    #[serde(rename = "TaxId")]
    #[tabled(rename = "TaxId")]
    pub holder_tax_id: String,
    #[serde(rename = "RadioLinks")]
    #[tabled(rename = "RadioLinks")]
    pub radio_links: usize,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share")]
    pub share: String,
}

/// One styled province circle for the choropleth layer.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ProvincePoint {
    pub province: String,
    pub lat: f64,
    pub lon: f64,
    pub count: usize,
    pub color: String,
    pub label: String,
}

/// One raw coordinate for the marker-cluster layer.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MarkerPoint {
    pub lat: f64,
    pub lon: f64,
    pub label: String,
}

/// Parameters of the linear color scale, handed to the renderer alongside
/// the sampled per-province colors.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ColorScaleParams {
    pub stops: [String; 3],
    pub domain_min: usize,
    pub domain_max: usize,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MapAggregation {
    pub center: [f64; 2],
    pub zoom: u8,
    pub scale: ColorScaleParams,
    pub points: Vec<ProvincePoint>,
    pub markers: Vec<MarkerPoint>,
    pub dropped_provinces: usize,
}

/// Map payload for the rendering backend. `NoData` tells it to draw the
/// default unfocused map; it is a terminal state, not an error.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapView {
    NoData { center: [f64; 2], zoom: u8 },
    Data(MapAggregation),
}
