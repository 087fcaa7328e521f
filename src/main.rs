// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use chrono::Weekday;
use rusqlite::Connection;
use std::env;
use std::path::PathBuf;

// Use library instead of local modules
use snackonomics::{
    classify, export_csv, final_price, import_csv, insert_observation, latest_observation,
    monthly_volume, observation_count, observations_since, projected_profit, setup_database,
    unit_cost, update_latest_elasticity, Category, Observation, WeeklySales,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("record") => run_record(&args[2..]),
        Some("analyze") => run_analyze(),
        Some("suggest") => run_suggest(&args[2..]),
        Some("week") => run_week(&args[2..]),
        Some("import") => run_import(&args[2..]),
        Some("export") => run_export(&args[2..]),
        Some("help") | Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        Some(other) => {
            eprintln!("❌ Unknown command: {}\n", other);
            print_usage();
            std::process::exit(2);
        }
        None => run_ui_mode(),
    }
}

fn print_usage() {
    println!("🥪 Snackonomics - price & elasticity analytics for the snack counter");
    println!();
    println!("Usage:");
    println!("  snackonomics                                  open the dashboard");
    println!("  snackonomics record <p_start> <p_end> <q_start> <q_end>");
    println!("                                                store a price experiment");
    println!("  snackonomics analyze                          compute elasticity for the newest record");
    println!("  snackonomics suggest <ingredient_cost> <monthly_labor> <daily_production> <margin_pct>");
    println!("                                                cost breakdown and suggested price");
    println!("  snackonomics week <mon> <tue> <wed> <thu> <fri> <sat> <sun>");
    println!("                                                project a week of sales to a month");
    println!("  snackonomics import <file.csv>                load observations from CSV");
    println!("  snackonomics export <file.csv>                dump observations to CSV");
    println!();
    println!("Database path comes from SNACK_DB (default: observations.db)");
}

fn db_path() -> PathBuf {
    env::var("SNACK_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("observations.db"))
}

fn open_database() -> Result<Connection> {
    let path = db_path();
    let conn = Connection::open(&path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

fn parse_number(args: &[String], index: usize, name: &str) -> Result<f64> {
    let raw = args
        .get(index)
        .with_context(|| format!("Missing argument: {}", name))?;
    raw.parse::<f64>()
        .with_context(|| format!("{} must be a number, got '{}'", name, raw))
}

fn run_record(args: &[String]) -> Result<()> {
    let price_start = parse_number(args, 0, "start price")?;
    let price_end = parse_number(args, 1, "end price")?;
    let quantity_start = parse_number(args, 2, "start quantity")?;
    let quantity_end = parse_number(args, 3, "end quantity")?;

    let obs = Observation::new(price_start, price_end, quantity_start, quantity_end);

    // Reject garbage up front; whether the elasticity is computable yet
    // does not matter at record time
    obs.compute_elasticity()?;

    let conn = open_database()?;
    if insert_observation(&conn, &obs)? {
        println!("✓ Recorded observation {}", obs.id);
        println!("  price: {:.2} → {:.2}", price_start, price_end);
        println!("  sales: {:.0} → {:.0}", quantity_start, quantity_end);
        println!("  Run `snackonomics analyze` to compute its elasticity.");
    } else {
        println!("✓ Skipped: identical observation already stored");
    }

    Ok(())
}

fn run_analyze() -> Result<()> {
    let conn = open_database()?;

    let Some(obs) = latest_observation(&conn)? else {
        println!("No observations yet. Record one first:");
        println!("  snackonomics record <p_start> <p_end> <q_start> <q_end>");
        return Ok(());
    };

    let epd = obs.compute_elasticity()?;
    update_latest_elasticity(&conn, epd)?;

    match epd {
        Some(value) => println!("Price elasticity of demand: {:.2}", value),
        None => println!("Price elasticity of demand: not computable for this record"),
    }

    let verdict = classify(epd);
    let icon = match verdict.category {
        Category::Warning => "⚠️",
        Category::Success => "✅",
        Category::Info => "📊",
    };
    println!("{} {}", icon, verdict.message);

    Ok(())
}

fn run_suggest(args: &[String]) -> Result<()> {
    let ingredient_cost = parse_number(args, 0, "ingredient cost per unit")?;
    let monthly_labor = parse_number(args, 1, "monthly labor cost")?;
    let daily_production = parse_number(args, 2, "daily production")?;
    let margin_percent = parse_number(args, 3, "margin percent")?;

    let cost = unit_cost(ingredient_cost, monthly_labor, daily_production)?;
    let price = final_price(cost, margin_percent)?;
    let monthly_units = monthly_volume(daily_production);
    let monthly_profit = projected_profit(cost, price, monthly_units)?;

    println!("💰 Cost per unit:        {:.2}", cost);
    println!("🏷️  Suggested price:      {:.2} ({:.1}% margin)", price, margin_percent);
    println!(
        "📈 Projected profit:     {:.2}/month at {:.0} units",
        monthly_profit, monthly_units
    );

    Ok(())
}

fn run_week(args: &[String]) -> Result<()> {
    const DAYS: [(Weekday, &str); 7] = [
        (Weekday::Mon, "Monday"),
        (Weekday::Tue, "Tuesday"),
        (Weekday::Wed, "Wednesday"),
        (Weekday::Thu, "Thursday"),
        (Weekday::Fri, "Friday"),
        (Weekday::Sat, "Saturday"),
        (Weekday::Sun, "Sunday"),
    ];

    if args.len() != DAYS.len() {
        bail!(
            "Expected 7 daily sales figures (Monday through Sunday), got {}",
            args.len()
        );
    }

    let mut week = WeeklySales::new();
    for (raw, (day, name)) in args.iter().zip(DAYS) {
        let sold: u32 = raw
            .parse()
            .with_context(|| format!("{} sales must be a whole number, got '{}'", name, raw))?;
        week.record(day, sold);
    }

    println!("📅 Sales this week:      {}", week.total());
    println!("📈 Monthly estimate:     {:.0} units", week.monthly_estimate());

    Ok(())
}

fn run_import(args: &[String]) -> Result<()> {
    let path = args.first().context("Missing argument: CSV file path")?;

    println!("📂 Loading {}...", path);
    let observations = import_csv(path.as_ref())?;
    println!("✓ Parsed {} observations", observations.len());

    let conn = open_database()?;
    let mut inserted = 0;
    let mut duplicates = 0;
    for obs in &observations {
        if insert_observation(&conn, obs)? {
            inserted += 1;
        } else {
            duplicates += 1;
        }
    }

    println!("✓ Inserted: {} observations", inserted);
    println!("✓ Skipped duplicates: {}", duplicates);
    println!("✓ Database contains {} observations", observation_count(&conn)?);

    Ok(())
}

fn run_export(args: &[String]) -> Result<()> {
    let path = args.first().context("Missing argument: CSV file path")?;

    let conn = open_database()?;
    let written = export_csv(&conn, path.as_ref())?;
    println!("✓ Wrote {} observations to {}", written, path);

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode() -> Result<()> {
    let conn = open_database()?;

    let observations = observations_since(&conn, None)?;
    let total_count = observation_count(&conn)?;

    if observations.is_empty() {
        println!("No observations yet - the dashboard will be empty.");
        println!("Record one first: snackonomics record <p_start> <p_end> <q_start> <q_end>\n");
    }

    println!("Starting dashboard... (Press 'q' to quit)\n");

    let mut app = ui::App::new(observations, total_count);
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode() -> Result<()> {
    eprintln!("❌ Dashboard mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin snack-server --features server");
    std::process::exit(1);
}
