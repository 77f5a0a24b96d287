//! # Section CLI
//!
//! Runs the analyses stored in a project file and writes their results.
//!
//! ```text
//! section_cli init beam.json
//! section_cli list beam.json
//! section_cli run beam.json --item "B1 interaction" --parallel --output results.json
//! ```
//!
//! Set `RUST_LOG=debug` to see solver progress.

use std::ops::ControlFlow;
use std::path::PathBuf;

use log::{debug, info};
use section_core::calculations::CalculationItem;
use section_core::progress::ProgressEvent;
use section_core::{load_project, save_project, save_results, CalcError, Project};
use structopt::StructOpt;

/// Command line options
#[derive(StructOpt, Debug)]
#[structopt(name = "section_cli", about = "Nonlinear analysis of concrete cross-sections")]
enum Command {
    /// Write an example project to start from
    Init {
        #[structopt(parse(from_os_str))]
        path: PathBuf,
    },
    /// List the sections and analysis items of a project
    List {
        #[structopt(parse(from_os_str))]
        project: PathBuf,
    },
    /// Run the analyses of a project
    Run {
        #[structopt(parse(from_os_str))]
        project: PathBuf,

        /// Only run the item with this label
        #[structopt(long)]
        item: Option<String>,

        /// Write every run (outputs and errors) to this JSON file
        #[structopt(long, short, parse(from_os_str))]
        output: Option<PathBuf>,

        /// Evaluate interaction and biaxial points on all cores
        #[structopt(long)]
        parallel: bool,
    },
}

fn log_progress(event: &ProgressEvent) -> ControlFlow<()> {
    match event {
        ProgressEvent::CurvatureStep { step, curvature, moment } => {
            debug!("step {}: kappa = {:.4e}, M = {:.4e}", step, curvature, moment)
        }
        ProgressEvent::SweepPoint { index, total, n, m } => {
            debug!("point {}/{}: N = {:.4e}, M = {:.4e}", index, total, n, m)
        }
    }
    ControlFlow::Continue(())
}

fn list(project: &Project) {
    println!("{} / {} ({})", project.meta.job_id, project.meta.client, project.meta.engineer);
    println!();
    println!("Sections:");
    for section in &project.sections {
        println!(
            "  {:<24} {} elements, {} bars",
            section.name,
            section.elements.len(),
            section.reinforcement.len()
        );
    }
    println!();
    println!("Items:");
    for (_, item) in project.items_by_label() {
        println!(
            "  {:<24} {:<16} on {}",
            item.calculation.label(),
            item.calculation.calc_type(),
            item.section
        );
    }
}

fn run(
    mut project: Project,
    item: Option<String>,
    output: Option<PathBuf>,
    parallel: bool,
) -> Result<(), CalcError> {
    if let Some(label) = item {
        project.items.retain(|_, i| i.calculation.label() == label);
        if project.items.is_empty() {
            return Err(CalcError::ItemNotFound { item: label });
        }
    }
    for analysis in project.items.values_mut() {
        analysis.calculation.set_parallel(parallel);
    }
    project.validate()?;

    let runs = project.run_all(&log_progress);
    let mut failed = 0;
    for run in &runs {
        match (&run.output, &run.error) {
            (Some(out), _) => println!("{:<24} {}", run.label, out.summary()),
            (None, Some(e)) => {
                failed += 1;
                println!("{:<24} FAILED [{}] {}", run.label, e.error_code(), e)
            }
            (None, None) => {}
        }
    }
    info!("{} items run, {} failed", runs.len(), failed);

    if let Some(path) = output {
        save_results(&runs, &path)?;
        println!();
        println!("Results written to {}", path.display());
    }
    Ok(())
}

fn main() -> Result<(), CalcError> {
    env_logger::init();

    match Command::from_args() {
        Command::Init { path } => {
            let project = Project::example();
            save_project(&project, &path)?;
            println!("Example project written to {}", path.display());
            println!("Items:");
            for (_, item) in project.items_by_label() {
                if let CalculationItem::Interaction(input) = &item.calculation {
                    println!("  {} ({} points)", input.label, input.n_points);
                } else {
                    println!("  {}", item.calculation.label());
                }
            }
        }
        Command::List { project } => list(&load_project(&project)?),
        Command::Run {
            project,
            item,
            output,
            parallel,
        } => run(load_project(&project)?, item, output, parallel)?,
    }
    Ok(())
}
