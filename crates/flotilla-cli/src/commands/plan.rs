//! Plan command - validate the plan and show what would run

use std::path::Path;

use console::style;
use flotilla_exec::DependencyGraph;
use flotilla_plan::Plan;

use crate::error::Result;

/// Which part of the plan to print
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PlanSection {
    Repositories,
    Registries,
    Releases,
    Waves,
    All,
}

impl PlanSection {
    fn wants(&self, section: PlanSection) -> bool {
        *self == PlanSection::All || *self == section
    }
}

/// Run the plan command
pub fn run(file: &Path, tags: &[String], only: PlanSection) -> Result<()> {
    let plan = Plan::from_file(file)?.with_tags(tags);

    if only.wants(PlanSection::Repositories) && !plan.repositories.is_empty() {
        println!("{}", style("Repositories:").bold());
        for repo in &plan.repositories {
            println!("  {} {} ({})", style("→").blue(), style(&repo.name).cyan(), repo.url);
        }
    }

    if only.wants(PlanSection::Registries) && !plan.registries.is_empty() {
        println!("{}", style("Registries:").bold());
        for registry in &plan.registries {
            println!("  {} {}", style("→").blue(), style(&registry.host).cyan());
        }
    }

    if only.wants(PlanSection::Releases) {
        println!("{}", style("Releases:").bold());
        for release in &plan.releases {
            let chart = match &release.chart.version {
                Some(version) => format!("{} {}", release.chart.name, version),
                None => release.chart.name.clone(),
            };
            print!(
                "  {} {} ({})",
                style("→").blue(),
                style(&release.uniq).cyan(),
                style(chart).yellow()
            );
            if !release.depends_on.is_empty() {
                let deps: Vec<String> =
                    release.depends_on.iter().map(|d| d.to_string()).collect();
                print!(" depends on {}", deps.join(", "));
            }
            println!();
        }
    }

    if only.wants(PlanSection::Waves) {
        // Building the graph also surfaces unresolved dependencies and cycles
        let graph = DependencyGraph::build(&plan.releases)?;
        println!("{}", graph.waves().summary());
    }

    Ok(())
}
