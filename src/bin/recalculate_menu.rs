//! Fetch a menu analysis, print adequacy per level, optionally rescale one nutrient and save.
//!
//! Usage: recalculate_menu <menu_id> [<level_id> <nutrient> <percent>] [--save]

use tracing_subscriber::EnvFilter;

use menu_adequacy::client::ApiClient;
use menu_adequacy::config::Config;
use menu_adequacy::models::{AnalysisSession, Level, Nutrient};
use menu_adequacy::nutrition::RescaleOutcome;

fn print_level(level: &Level) {
    println!("\nLevel {} - {}", level.id, level.name);
    println!(
        "  Net weight: {:.1} g | Gross weight: {:.1} g | Rows: {}",
        level.totals.net_weight,
        level.totals.gross_weight,
        level.rows.len()
    );
    if level.requirement.is_none() {
        println!("  (no requirement loaded)");
    }
    for n in Nutrient::ALL {
        let adequacy = level.adequacy.get(n);
        println!(
            "  {:<14} {:>10.2} {:<4} {:>6.1}%  {}",
            n.as_str(),
            level.totals.nutrients.get(n),
            n.unit(),
            adequacy.percentage,
            adequacy.class.as_str()
        );
    }
}

fn usage() -> Box<dyn std::error::Error> {
    "usage: recalculate_menu <menu_id> [<level_id> <nutrient> <percent>] [--save]".into()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("menu_adequacy=warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let save = args.iter().any(|a| a == "--save");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let menu_id: i64 = positional.first().ok_or_else(usage)?.parse()?;
    let rescale = match positional.len() {
        1 => None,
        4 => {
            let level_id: i64 = positional[1].parse()?;
            let nutrient = Nutrient::from_str(positional[2])
                .ok_or_else(|| format!("unknown nutrient '{}'", positional[2]))?;
            let percent: f64 = positional[3].parse()?;
            Some((level_id, nutrient, percent))
        }
        _ => return Err(usage()),
    };

    let config = Config::from_env();
    let client = ApiClient::new(config.client.clone())?;

    let mut session: AnalysisSession = client.fetch_analysis(menu_id).await?;
    println!(
        "Menu {}{}",
        session.menu_id,
        session.menu_name.as_deref().map(|n| format!(" - {}", n)).unwrap_or_default()
    );
    for level in &session.levels {
        print_level(level);
    }

    let Some((level_id, nutrient, percent)) = rescale else {
        return Ok(());
    };

    let outcome = session.rescale_from_adequacy(level_id, nutrient, percent)?;
    match outcome {
        RescaleOutcome::Applied { scale_factor, rows_rescaled, .. } => {
            println!("\nRescaled {} rows by {:.4} for {}", rows_rescaled, scale_factor, nutrient);
            print_level(session.level(level_id)?);
        }
        other => {
            println!("\nNothing rescaled: {:?}", other);
            return Ok(());
        }
    }

    if save {
        match client.save_level(&session, level_id).await {
            Ok(reply) => println!("\n{}", reply.notification()),
            Err(e) => eprintln!("\nSave failed: {}", e),
        }
    }

    Ok(())
}
