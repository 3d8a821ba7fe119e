use crate::types::{Dataset, LicenseRecord, RawLicenseRow, RawProvinceRow};
use crate::util::{days_between, parse_date, parse_f64_safe, sorted_unique};
use anyhow::Result;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

/// A non-empty field that should have parsed but did not. Treated as fatal
/// input corruption: the load halts instead of silently dropping the row.
#[derive(Debug)]
pub struct MalformedInputError {
    pub reference: String,
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for MalformedInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record {}: malformed {} value {:?}",
            self.reference, self.field, self.value
        )
    }
}

impl std::error::Error for MalformedInputError {}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub skipped_rows: usize,
    pub imputed_dates: usize,
}

/// Load and clean the license CSV.
///
/// `today` is injected rather than read from the system clock so the derived
/// `days_remaining` field is deterministic. An empty expiration date is
/// imputed with `today` (so the row starts at 0 days remaining); a non-empty
/// one that does not parse halts the load with [`MalformedInputError`].
/// Rows without a usable reference or frequency cannot participate in the
/// range bounds and are skipped, counted in the report.
pub fn load_dataset(path: &str, today: NaiveDate) -> Result<(Dataset, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut total_rows = 0usize;
    let mut skipped_rows = 0usize;
    let mut imputed_dates = 0usize;
    let mut records: Vec<LicenseRecord> = Vec::new();

    for result in rdr.deserialize::<RawLicenseRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                skipped_rows += 1;
                continue;
            }
        };

        let reference = match row.reference.as_deref().map(str::trim) {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => {
                skipped_rows += 1;
                continue;
            }
        };
        let frequency = match parse_f64_safe(row.frequency.as_deref()) {
            Some(f) => f,
            None => {
                skipped_rows += 1;
                continue;
            }
        };

        let expiration_date = match row.expiration_date.as_deref().map(str::trim) {
            None | Some("") => {
                imputed_dates += 1;
                today
            }
            Some(raw) => match parse_date(raw) {
                Some(d) => d,
                None => {
                    return Err(MalformedInputError {
                        reference,
                        field: "expiration date",
                        value: raw.to_string(),
                    }
                    .into());
                }
            },
        };
        let days_remaining = days_between(today, expiration_date);

        let province = clean_field(row.province, "Unknown");
        let municipality = clean_field(row.municipality, "Unknown");
        let holder_name = clean_field(row.holder_name, "Unknown");
        let holder_tax_id = clean_field(row.holder_tax_id, "Unknown");

        records.push(LicenseRecord {
            reference,
            frequency,
            expiration_date,
            days_remaining,
            province,
            municipality,
            holder_name,
            holder_tax_id,
        });
    }

    if skipped_rows > 0 {
        warn!(skipped_rows, "rows without usable reference/frequency skipped");
    }
    info!(
        total_rows,
        loaded_rows = records.len(),
        imputed_dates,
        "license dataset loaded"
    );

    let report = LoadReport {
        total_rows,
        loaded_rows: records.len(),
        skipped_rows,
        imputed_dates,
    };
    Ok((build_dataset(records), report))
}

fn clean_field(value: Option<String>, default: &str) -> String {
    match value {
        Some(v) => {
            let t = v.trim();
            if t.is_empty() {
                default.to_string()
            } else {
                t.to_string()
            }
        }
        None => default.to_string(),
    }
}

/// Derive the range-selector bounds and the sorted option lists. These are
/// load-time snapshots; the dataset does not change afterwards.
fn build_dataset(records: Vec<LicenseRecord>) -> Dataset {
    let mut min_freq = f64::MAX;
    let mut max_freq = f64::MIN;
    let mut min_days = i64::MAX;
    let mut max_days = i64::MIN;
    for r in &records {
        min_freq = min_freq.min(r.frequency);
        max_freq = max_freq.max(r.frequency);
        min_days = min_days.min(r.days_remaining);
        max_days = max_days.max(r.days_remaining);
    }
    if records.is_empty() {
        min_freq = 0.0;
        max_freq = 0.0;
        min_days = 0;
        max_days = 0;
    }

    let provinces = sorted_unique(records.iter().map(|r| r.province.as_str()));
    let municipalities = sorted_unique(records.iter().map(|r| r.municipality.as_str()));
    let holders = sorted_unique(records.iter().map(|r| r.holder_name.as_str()));

    Dataset {
        records,
        min_freq,
        max_freq,
        min_days,
        max_days,
        provinces,
        municipalities,
        holders,
    }
}

/// Load the province coordinate table. The join key is the province name,
/// matched exactly (case-sensitive) against the license records. Rows with
/// unparseable coordinates are skipped.
pub fn load_province_coords(path: &str) -> Result<HashMap<String, (f64, f64)>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut coords = HashMap::new();
    for result in rdr.deserialize::<RawProvinceRow>() {
        let row = result?;
        let name = match row.province.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => continue,
        };
        let (lat, lon) = match (
            parse_f64_safe(row.lat.as_deref()),
            parse_f64_safe(row.lon.as_deref()),
        ) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => continue,
        };
        coords.insert(name, (lat, lon));
    }
    info!(provinces = coords.len(), "coordinate table loaded");
    Ok(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    const HEADER: &str = "Ref,Frecuencia,FCaducidad,Provincia_FREQ,Municipio,Titular,NIF/CIF\n";

    fn init_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    fn write_csv(body: &str) -> Result<NamedTempFile> {
        let mut f = NamedTempFile::new()?;
        f.write_all(HEADER.as_bytes())?;
        f.write_all(body.as_bytes())?;
        f.flush()?;
        Ok(f)
    }

    #[test]
    fn loads_and_derives_days_remaining() -> Result<()> {
        init_logging();
        let f = write_csv(
            "R1,7.4,16/08/2026,Madrid,Madrid,Acme SL,B111\n\
             R2,18.0,2026-08-01,Cuenca,Cuenca,Beta SA,A222\n",
        )?;
        let (ds, report) = load_dataset(f.path().to_str().unwrap(), today())?;
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.loaded_rows, 2);
        assert_eq!(report.skipped_rows, 0);
        assert_eq!(ds.records[0].days_remaining, 10);
        assert_eq!(ds.records[1].days_remaining, -5);
        assert_eq!((ds.min_freq, ds.max_freq), (7.4, 18.0));
        assert_eq!((ds.min_days, ds.max_days), (-5, 10));
        assert_eq!(ds.provinces, vec!["Cuenca", "Madrid"]);
        Ok(())
    }

    #[test]
    fn empty_expiration_is_imputed_with_today() -> Result<()> {
        let f = write_csv("R1,7.4,,Madrid,Madrid,Acme SL,B111\n")?;
        let (ds, report) = load_dataset(f.path().to_str().unwrap(), today())?;
        assert_eq!(report.imputed_dates, 1);
        assert_eq!(ds.records[0].expiration_date, today());
        assert_eq!(ds.records[0].days_remaining, 0);
        Ok(())
    }

    #[test]
    fn malformed_date_halts_the_load() -> Result<()> {
        let f = write_csv("R1,7.4,not-a-date,Madrid,Madrid,Acme SL,B111\n")?;
        let err = load_dataset(f.path().to_str().unwrap(), today()).unwrap_err();
        let malformed = err.downcast_ref::<MalformedInputError>().unwrap();
        assert_eq!(malformed.reference, "R1");
        assert_eq!(malformed.value, "not-a-date");
        Ok(())
    }

    #[test]
    fn rows_without_frequency_are_skipped_and_counted() -> Result<()> {
        init_logging();
        let f = write_csv(
            "R1,,16/08/2026,Madrid,Madrid,Acme SL,B111\n\
             R2,18.0,16/08/2026,Cuenca,Cuenca,Beta SA,A222\n",
        )?;
        let (ds, report) = load_dataset(f.path().to_str().unwrap(), today())?;
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(ds.records.len(), 1);
        assert_eq!(ds.records[0].reference, "R2");
        Ok(())
    }

    #[test]
    fn missing_categoricals_default_to_unknown() -> Result<()> {
        let f = write_csv("R1,7.4,16/08/2026,,,,\n")?;
        let (ds, _) = load_dataset(f.path().to_str().unwrap(), today())?;
        assert_eq!(ds.records[0].province, "Unknown");
        assert_eq!(ds.records[0].holder_tax_id, "Unknown");
        Ok(())
    }

    #[test]
    fn coordinate_table_parses_and_skips_bad_rows() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        f.write_all(b"provincias,lat,long\nMadrid,40.4,-3.7\nCuenca,,\n")?;
        f.flush()?;
        let coords = load_province_coords(f.path().to_str().unwrap())?;
        assert_eq!(coords.len(), 1);
        assert_eq!(coords.get("Madrid"), Some(&(40.4, -3.7)));
        Ok(())
    }
}
