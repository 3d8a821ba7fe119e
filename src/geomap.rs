use crate::types::{
    ColorScaleParams, LicenseRecord, MapAggregation, MapView, MarkerPoint, ProvincePoint,
};
use std::collections::HashMap;
use tracing::warn;

/// Default viewport when there is nothing to focus on (roughly the
/// geographic center of Spain, matching the upstream dataset).
pub const DEFAULT_CENTER: [f64; 2] = [40.416775, -3.703790];
pub const DEFAULT_ZOOM: u8 = 6;

const STOP_LOW: (u8, u8, u8) = (255, 0, 0); // red
const STOP_MID: (u8, u8, u8) = (255, 255, 0); // yellow
const STOP_HIGH: (u8, u8, u8) = (0, 128, 0); // green

/// Linear three-stop color scale over a count domain. A degenerate domain
/// (min == max) anchors every sample at the low stop.
#[derive(Debug, Clone, Copy)]
pub struct LinearColorScale {
    domain_min: usize,
    domain_max: usize,
}

impl LinearColorScale {
    pub fn new(domain_min: usize, domain_max: usize) -> Self {
        LinearColorScale {
            domain_min,
            domain_max,
        }
    }

    pub fn sample(&self, value: usize) -> String {
        let range = self.domain_max.saturating_sub(self.domain_min);
        let t = if range == 0 {
            0.0
        } else {
            (value.saturating_sub(self.domain_min) as f64 / range as f64).clamp(0.0, 1.0)
        };
        let (r, g, b) = if t < 0.5 {
            lerp_rgb(STOP_LOW, STOP_MID, t * 2.0)
        } else {
            lerp_rgb(STOP_MID, STOP_HIGH, (t - 0.5) * 2.0)
        };
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    pub fn params(&self) -> ColorScaleParams {
        ColorScaleParams {
            stops: [
                rgb_hex(STOP_LOW),
                rgb_hex(STOP_MID),
                rgb_hex(STOP_HIGH),
            ],
            domain_min: self.domain_min,
            domain_max: self.domain_max,
        }
    }
}

fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let ch = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    (ch(a.0, b.0), ch(a.1, b.1), ch(a.2, b.2))
}

fn rgb_hex((r, g, b): (u8, u8, u8)) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Aggregate a filtered view into the map payload.
///
/// Records are grouped by province and left-joined against the coordinate
/// table on the exact province name. Provinces with no coordinate entry are
/// excluded from the payload; the count of exclusions is carried in the
/// result and logged, since it usually means the two input files disagree on
/// a province spelling. An empty view short-circuits to [`MapView::NoData`].
pub fn build_map_view(
    view: &[&LicenseRecord],
    coords: &HashMap<String, (f64, f64)>,
) -> MapView {
    if view.is_empty() {
        return MapView::NoData {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        };
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in view {
        *counts.entry(r.province.as_str()).or_default() += 1;
    }

    let mut joined: Vec<(&str, (f64, f64), usize)> = Vec::new();
    let mut dropped_provinces = 0usize;
    for (province, count) in counts {
        match coords.get(province) {
            Some(&coord) => joined.push((province, coord, count)),
            None => dropped_provinces += 1,
        }
    }
    if dropped_provinces > 0 {
        warn!(
            dropped_provinces,
            "provinces missing from the coordinate table were left off the map"
        );
    }
    // Deterministic payload order regardless of hash iteration
    joined.sort_by(|a, b| a.0.cmp(b.0));

    let domain_min = joined.iter().map(|j| j.2).min().unwrap_or(0);
    let domain_max = joined.iter().map(|j| j.2).max().unwrap_or(0);
    let scale = LinearColorScale::new(domain_min, domain_max);

    let mut points = Vec::with_capacity(joined.len());
    let mut markers = Vec::with_capacity(joined.len());
    for (province, (lat, lon), count) in joined {
        let label = format!("Provincia: {} ({} radio links)", province, count);
        points.push(ProvincePoint {
            province: province.to_string(),
            lat,
            lon,
            count,
            color: scale.sample(count),
            label: label.clone(),
        });
        markers.push(MarkerPoint { lat, lon, label });
    }

    MapView::Data(MapAggregation {
        center: DEFAULT_CENTER,
        zoom: DEFAULT_ZOOM,
        scale: scale.params(),
        points,
        markers,
        dropped_provinces,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(province: &str) -> LicenseRecord {
        LicenseRecord {
            reference: "R".to_string(),
            frequency: 7.4,
            expiration_date: NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
            days_remaining: 0,
            province: province.to_string(),
            municipality: "M".to_string(),
            holder_name: "H".to_string(),
            holder_tax_id: "T".to_string(),
        }
    }

    fn coords(entries: &[(&str, f64, f64)]) -> HashMap<String, (f64, f64)> {
        entries
            .iter()
            .map(|(name, lat, lon)| (name.to_string(), (*lat, *lon)))
            .collect()
    }

    #[test]
    fn empty_view_is_the_no_data_state() {
        let view: Vec<&LicenseRecord> = Vec::new();
        match build_map_view(&view, &HashMap::new()) {
            MapView::NoData { center, zoom } => {
                assert_eq!(center, DEFAULT_CENTER);
                assert_eq!(zoom, DEFAULT_ZOOM);
            }
            MapView::Data(_) => panic!("expected NoData"),
        }
    }

    #[test]
    fn unmatched_provinces_are_dropped_but_counted() {
        let records: Vec<LicenseRecord> = std::iter::repeat_with(|| rec("A"))
            .take(5)
            .chain(std::iter::repeat_with(|| rec("B")).take(3))
            .collect();
        let view: Vec<&LicenseRecord> = records.iter().collect();
        let table = coords(&[("A", 40.0, -3.0)]);
        match build_map_view(&view, &table) {
            MapView::Data(agg) => {
                assert_eq!(agg.points.len(), 1);
                assert_eq!(agg.points[0].province, "A");
                assert_eq!(agg.points[0].count, 5);
                assert_eq!(agg.dropped_provinces, 1);
                assert_eq!(agg.markers.len(), 1);
            }
            MapView::NoData { .. } => panic!("expected Data"),
        }
    }

    #[test]
    fn points_carry_scaled_colors_and_labels() {
        let records: Vec<LicenseRecord> = std::iter::repeat_with(|| rec("A"))
            .take(1)
            .chain(std::iter::repeat_with(|| rec("B")).take(3))
            .chain(std::iter::repeat_with(|| rec("C")).take(5))
            .collect();
        let view: Vec<&LicenseRecord> = records.iter().collect();
        let table = coords(&[("A", 40.0, -3.0), ("B", 41.0, -2.0), ("C", 42.0, -1.0)]);
        match build_map_view(&view, &table) {
            MapView::Data(agg) => {
                assert_eq!(agg.scale.domain_min, 1);
                assert_eq!(agg.scale.domain_max, 5);
                // sorted by province name, domain endpoints hit the stops
                assert_eq!(agg.points[0].color, "#ff0000");
                assert_eq!(agg.points[1].color, "#ffff00");
                assert_eq!(agg.points[2].color, "#008000");
                assert_eq!(agg.points[0].label, "Provincia: A (1 radio links)");
                assert_eq!(agg.markers[2].label, "Provincia: C (5 radio links)");
            }
            MapView::NoData { .. } => panic!("expected Data"),
        }
    }

    #[test]
    fn single_province_domain_samples_the_low_stop() {
        let records = vec![rec("A"), rec("A")];
        let view: Vec<&LicenseRecord> = records.iter().collect();
        let table = coords(&[("A", 40.0, -3.0)]);
        match build_map_view(&view, &table) {
            MapView::Data(agg) => assert_eq!(agg.points[0].color, "#ff0000"),
            MapView::NoData { .. } => panic!("expected Data"),
        }
    }

    #[test]
    fn scale_midpoint_is_yellow() {
        let scale = LinearColorScale::new(0, 10);
        assert_eq!(scale.sample(5), "#ffff00");
        assert_eq!(scale.sample(0), "#ff0000");
        assert_eq!(scale.sample(10), "#008000");
    }
}
