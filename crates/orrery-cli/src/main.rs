use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::DVec3;
use hifitime::Epoch;
use orrery_core::constants::AU;
use orrery_core::OrbitModel;
use orrery_graph::{
    load_system_file, BodyGraph, BodyId, GraphConfig, LoaderRegistry, Observer, ViewParams,
};
use orrery_sim::{epoch_to_jd, Planet, TimeController};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

#[derive(Parser)]
#[command(name = "orrery")]
#[command(about = "Celestial body graph driver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the body tree of a system file
    Bodies {
        file: PathBuf,
    },

    /// Run frames while flying toward a body, reporting reference switches
    Simulate {
        file: PathBuf,

        #[arg(short, long, default_value = "600")]
        frames: usize,

        /// Body to fly toward
        #[arg(long)]
        travel_to: String,

        /// Body the observer starts at (defaults to the system's light body)
        #[arg(long)]
        from: Option<String>,

        /// Meters travelled per frame (defaults to 1% of the starting distance)
        #[arg(long)]
        speed: Option<f64>,

        #[arg(short, long, default_value = "2000-01-01T12:00:00 UTC")]
        epoch: String,

        /// Simulated days per real second
        #[arg(long, default_value = "0")]
        rate: f64,
    },

    /// Resolve a name through the registry and the display-name scan
    Find {
        file: PathBuf,
        name: String,
    },

    /// Show heliocentric planet positions at epoch
    Planets {
        #[arg(short, long, default_value = "2000-01-01T12:00:00 UTC")]
        epoch: String,
    },
}

fn load(path: &Path) -> Result<(BodyGraph, BodyId)> {
    let mut graph = BodyGraph::new(GraphConfig::default());
    let report = load_system_file(&mut graph, &LoaderRegistry::default(), path)
        .with_context(|| format!("loading {}", path.display()))?;
    if report.skipped > 0 {
        println!("{} record(s) skipped:", report.skipped);
        for (name, reason) in &report.problems {
            println!("  {name}: {reason}");
        }
    }
    let root = report.root.context("system has no root")?;
    Ok((graph, root))
}

fn print_tree(graph: &BodyGraph, id: BodyId, depth: usize) {
    let Some(body) = graph.body(id) else {
        return;
    };
    let orbit = body.orbit().map_or("-", |o| o.kind());
    println!(
        "{:indent$}{:<width$} {:<12} {:>12.4e} {:>10} {}",
        "",
        body.display_name(),
        body.kind().as_str(),
        body.radius(),
        orbit,
        if body.is_isolated() { "isolated" } else { "" },
        indent = depth * 2,
        width = 24usize.saturating_sub(depth * 2),
    );
    for child in body.children() {
        print_tree(graph, *child, depth + 1);
    }
}

fn find(graph: &BodyGraph, name: &str) -> Result<BodyId> {
    graph
        .find_body(name)
        .or_else(|| graph.find_body_name_i18n(name))
        .with_context(|| format!("no body named {name:?}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Bodies { file } => {
            let (graph, root) = load(&file)?;
            println!("{:<24} {:<12} {:>12} {:>10}", "Body", "Type", "Radius (m)", "Orbit");
            print_tree(&graph, root, 0);
            if !graph.hidden().is_empty() {
                println!("Hidden:");
                for id in graph.hidden() {
                    if let Some(body) = graph.body(*id) {
                        println!("  {}", body.name());
                    }
                }
            }
        }

        Commands::Simulate { file, frames, travel_to, from, speed, epoch, rate } => {
            let (mut graph, root) = load(&file)?;
            let target = find(&graph, &travel_to)?;
            let start = match from {
                Some(name) => find(&graph, &name)?,
                None => graph.light(root).unwrap_or(root),
            };

            let mut clock = TimeController::at_epoch(Epoch::from_str(&epoch)?);
            clock.set_rate_days_per_second(rate);
            let jd = clock.julian_day();

            let standoff = graph.body(start).map_or(1.0, |b| b.radius() * 3.0).max(1.0);
            let origin = DVec3::new(0.0, 0.0, standoff);
            let mut observer = Observer::new(&mut graph, start, origin, ViewParams::default())
                .context("start body vanished")?;
            let distance = observer
                .body_position(&mut graph, target, jd)
                .context("target is not connected to the start body")?
                .length();
            let step = speed.unwrap_or(distance / 100.0);
            info!(from = %start, to = %target, distance, step, "starting flight");

            let mut reference = observer.reference_body(&graph);
            for frame in 0..frames {
                let jd = epoch_to_jd(clock.tick(1.0 / 60.0));
                let remaining = observer.move_toward(&mut graph, target, step, jd).unwrap_or(0.0);
                let Some(ctx) = observer.update(&mut graph, jd) else {
                    anyhow::bail!("observer lost its reference body");
                };

                let now = observer.reference_body(&graph);
                if now != reference {
                    let name = now.and_then(|id| graph.body(id)).map_or("?", |b| b.name());
                    println!(
                        "frame {frame:>5}: -> {name:<16} {remaining:.4e} m left, {} updated",
                        ctx.updated.len()
                    );
                    reference = now;
                }
                if remaining <= 0.0 {
                    break;
                }
            }
            println!("{} reference switch(es)", observer.switch_count());
            observer.release(&mut graph);
        }

        Commands::Find { file, name } => {
            let (graph, _) = load(&file)?;
            let show = |label: &str, id: Option<BodyId>| {
                match id.and_then(|id| graph.body(id).map(|b| (id, b))) {
                    Some((id, body)) => {
                        println!("{label:<20} {id} {} ({})", body.name(), body.display_name())
                    }
                    None => println!("{label:<20} not found"),
                }
            };
            println!("exists: {}", graph.exists(&name));
            show("find_body", graph.find_body(&name));
            show("find_body_name_i18n", graph.find_body_name_i18n(&name));
        }

        Commands::Planets { epoch } => {
            let jd = epoch_to_jd(Epoch::from_str(&epoch)?);
            println!(
                "{:<12} {:>15} {:>15} {:>15} {:>12}",
                "Body", "X (AU)", "Y (AU)", "Z (AU)", "Dist (AU)"
            );
            for planet in Planet::ALL.into_iter().filter(|p| *p != Planet::Moon) {
                let p = planet.orbit().position_at(jd);
                println!(
                    "{:<12} {:>15.6} {:>15.6} {:>15.6} {:>12.4}",
                    planet.name(),
                    p.x / AU,
                    p.y / AU,
                    p.z / AU,
                    p.length() / AU
                );
            }
        }
    }

    Ok(())
}
