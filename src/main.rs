// Entry point and high-level CLI flow.
//
// - Option [1] loads the license CSV and the province coordinate table,
//   printing load diagnostics.
// - Option [2] prompts for filter values, then prints the KPIs, previews
//   the top-owners ranking, and exports the ranking plus the map payload.
// - After a query, the user can go back to the menu or exit.
mod filter;
mod geomap;
mod loader;
mod output;
mod reports;
mod types;
mod util;

use anyhow::Result;
use chrono::Local;
use filter::FilterParams;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::env;
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use types::{Dataset, MapView};

// Simple in-memory app state so we only load the CSVs once but can run
// any number of filter queries in a single session.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        dataset: None,
        coords: None,
    })
});

struct AppState {
    dataset: Option<Dataset>,
    coords: Option<HashMap<String, (f64, f64)>>,
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    read_line("Enter choice: ")
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the menu after a query.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        match read_line("Back to filter menu (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Prompt for a numeric range. Blank keeps the dataset-wide bounds; anything
/// else must be two numbers (low and high) separated by whitespace.
fn prompt_range_f64(label: &str, low: f64, high: f64) -> (f64, f64) {
    loop {
        let line = read_line(&format!("{} [{} {}] (blank = full): ", label, low, high));
        if line.is_empty() {
            return (low, high);
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() == 2 {
            if let (Ok(a), Ok(b)) = (parts[0].parse::<f64>(), parts[1].parse::<f64>()) {
                return (a, b);
            }
        }
        println!("Invalid range. Enter two numbers, e.g. `7.4 38.6`.");
    }
}

fn prompt_range_i64(label: &str, low: i64, high: i64) -> (i64, i64) {
    loop {
        let line = read_line(&format!("{} [{} {}] (blank = full): ", label, low, high));
        if line.is_empty() {
            return (low, high);
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() == 2 {
            if let (Ok(a), Ok(b)) = (parts[0].parse::<i64>(), parts[1].parse::<i64>()) {
                return (a, b);
            }
        }
        println!("Invalid range. Enter two integers, e.g. `-30 365`.");
    }
}

/// Prompt for a comma-separated selection. Blank selects every known option.
fn prompt_set(label: &str, options: &[String]) -> HashSet<String> {
    let line = read_line(&format!(
        "{} ({} options, comma separated, blank = all): ",
        label,
        util::format_int(options.len() as i64)
    ));
    if line.is_empty() {
        return options.iter().cloned().collect();
    }
    line.split(',').map(|s| s.trim().to_string()).collect()
}

/// Handle option [1]: load the license CSV and the coordinate table.
fn handle_load() {
    let data_path = env::var("RADIOLINK_DATA").unwrap_or_else(|_| "data.csv".to_string());
    let coords_path =
        env::var("RADIOLINK_PROVINCES").unwrap_or_else(|_| "provincias.csv".to_string());
    let today = Local::now().date_naive();

    let (dataset, report) = match loader::load_dataset(&data_path, today) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Failed to load {}: {:#}\n", data_path, e);
            return;
        }
    };
    let coords = match loader::load_province_coords(&coords_path) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Failed to load {}: {:#}\n", coords_path, e);
            return;
        }
    };

    println!(
        "Processing dataset... ({} rows read, {} records loaded)",
        util::format_int(report.total_rows as i64),
        util::format_int(report.loaded_rows as i64)
    );
    if report.skipped_rows > 0 {
        println!(
            "Note: {} rows skipped (no usable reference/frequency).",
            util::format_int(report.skipped_rows as i64)
        );
    }
    if report.imputed_dates > 0 {
        println!(
            "Info: {} empty expiration dates imputed with today.",
            util::format_int(report.imputed_dates as i64)
        );
    }
    println!(
        "Frequency range: {} to {}. Days-to-expiration range: {} to {}.\n",
        dataset.min_freq, dataset.max_freq, dataset.min_days, dataset.max_days
    );

    let mut state = APP_STATE.lock().unwrap();
    state.dataset = Some(dataset);
    state.coords = Some(coords);
}

/// Handle option [2]: prompt for filter values, run the query, print and
/// export the three result views.
fn handle_query() {
    let state = APP_STATE.lock().unwrap();
    let (Some(dataset), Some(coords)) = (state.dataset.as_ref(), state.coords.as_ref()) else {
        println!("Error: No data loaded. Please load the dataset first (option 1).\n");
        return;
    };

    let mut params = FilterParams::match_all(dataset);
    (params.low_freq, params.high_freq) =
        prompt_range_f64("Frequency range", dataset.min_freq, dataset.max_freq);
    (params.low_days, params.high_days) =
        prompt_range_i64("Days-to-expiration range", dataset.min_days, dataset.max_days);
    params.provinces = prompt_set("Provinces", &dataset.provinces);
    params.municipalities = prompt_set("Municipalities", &dataset.municipalities);
    params.holders = prompt_set("Holders", &dataset.holders);
    let view = filter::filter_records(dataset, &params);
    info!(matched = view.len(), "filter applied");

    let kpis = reports::compute_kpis(&view);
    println!("\nKPIs");
    println!(
        "Radio links: {}",
        util::format_int(kpis.record_count as i64)
    );
    println!(
        "Companies: {}",
        util::format_int(kpis.company_count as i64)
    );
    println!(
        "Avg. radio links per company: {}\n",
        util::format_int(kpis.avg_per_company)
    );
    if let Err(e) = output::write_json("kpi_summary.json", &kpis) {
        eprintln!("Write error: {:#}", e);
    }

    let ranking = reports::top_owners(&view);
    println!("Top owners");
    output::preview_table_rows(&ranking, 10);
    if let Err(e) = output::write_csv("top_owners.csv", &ranking) {
        eprintln!("Write error: {:#}", e);
    }
    println!("(Full table exported to top_owners.csv)\n");

    let map_view = geomap::build_map_view(&view, coords);
    match &map_view {
        MapView::NoData { .. } => {
            println!("Map: no matching records; payload asks for the default map.")
        }
        MapView::Data(agg) => {
            println!(
                "Map: {} provinces plotted ({} dropped, missing coordinates).",
                util::format_int(agg.points.len() as i64),
                util::format_int(agg.dropped_provinces as i64)
            );
        }
    }
    if let Err(e) = output::write_json("map_payload.json", &map_view) {
        eprintln!("Write error: {:#}", e);
    }
    println!("(Map payload exported to map_payload.json)\n");
}

fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env_filter).init();

    loop {
        println!("Select an option:");
        println!("[1] Load the dataset");
        println!("[2] Explore with filters\n");
        match read_choice().as_str() {
            "1" => {
                handle_load();
            }
            "2" => {
                println!("");
                handle_query();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
    Ok(())
}
