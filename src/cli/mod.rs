//! CLI command handling
//!
//! Loads the configuration, drives the runner and formats output.

use colored::Colorize;
use serde_json::Value;
use tracing::{info, warn};

use crate::commands::{Commands, VarCommands};
use crate::common::config::{Config, StoreBackend};
use crate::common::{logging, Error, Result};
use crate::context::RunContext;
use crate::http::HttpDispatcher;
use crate::store::{VariableStore, YamlFileStore};
use crate::testing::{case_problems, plan_groups, print_summary, run_suite, StopSignal};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            config,
            env,
            groups,
            verbose,
            no_log_file,
        } => {
            let config = Config::load(config.as_deref())?;

            // Keep the guard alive until the run is over so the file writer flushes
            let _guard = if no_log_file {
                logging::init_cli(verbose);
                None
            } else {
                logging::init_run(verbose, &config.resolve(&config.log_dir))
            };

            let environment = config.environment(env.as_deref())?;
            info!(
                "Environment: {} ({})",
                env.as_deref().unwrap_or(&config.env),
                environment.base_url
            );

            let mut ctx = RunContext::from_config(&config)?;
            let dispatcher = HttpDispatcher::from_environment(environment)?;
            let plans = plan_groups(&config, &groups)?;

            let stop = StopSignal::new();
            let handler = stop.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping after the current case");
                    handler.stop();
                }
            });

            let suite = run_suite(&mut ctx, &dispatcher, &plans, &stop).await;
            print_summary(&suite);
            suite.check()
        }

        Commands::List { config } => {
            let config = Config::load(config.as_deref())?;
            let plans = plan_groups(&config, &[])?;

            if plans.is_empty() {
                println!("No groups configured");
                return Ok(());
            }

            for (i, plan) in plans.iter().enumerate() {
                let mut line = format!("{}. {}", i + 1, plan.name.bold());
                if !plan.requires.is_empty() {
                    line.push_str(&format!(" (requires: {})", plan.requires.join(", ")));
                }
                println!("{}", line);
                println!("   {}", plan.cases_path.display().to_string().dimmed());

                match plan.load() {
                    Ok(cases) => {
                        for case in cases {
                            println!("   - {} {}", case.case_id, case.title.dimmed());
                        }
                    }
                    Err(e) => println!("   {} {}", "✗".red(), e.to_string().red()),
                }
            }
            Ok(())
        }

        Commands::Validate { config } => {
            let config = Config::load(config.as_deref())?;
            config.environment(None)?;
            let plans = plan_groups(&config, &[])?;

            let mut problems = 0usize;
            let mut checked = 0usize;
            for plan in &plans {
                let cases = match plan.load() {
                    Ok(cases) => cases,
                    Err(e) => {
                        println!("{} {}: {}", "✗".red(), plan.name, e);
                        problems += 1;
                        continue;
                    }
                };

                for case in &cases {
                    checked += 1;
                    for problem in case_problems(case) {
                        println!("{} {}/{}: {}", "✗".red(), plan.name, case.case_id, problem);
                        problems += 1;
                    }
                }
            }

            if problems > 0 {
                return Err(Error::Config(format!(
                    "{} problem(s) found in {} case(s)",
                    problems, checked
                )));
            }
            println!(
                "{} {} groups, {} cases OK",
                "✓".green(),
                plans.len(),
                checked
            );
            Ok(())
        }

        Commands::Var { config, command } => {
            let config = Config::load(config.as_deref())?;
            let mut store = state_store(&config)?;

            match command {
                VarCommands::Get { path } => {
                    let value = store
                        .get(&path)?
                        .ok_or_else(|| Error::MissingVariable(path.clone()))?;
                    print_yaml(&value)?;
                }

                VarCommands::Set { path, value } => {
                    let parsed: Value = serde_yaml::from_str(&value)?;
                    store.set(&path, parsed)?;
                    println!("Set {} in {}", path, store.describe());
                }

                VarCommands::List => {
                    print_yaml(&store.snapshot()?)?;
                }
            }
            Ok(())
        }
    }
}

/// The persistent state store named in the configuration
fn state_store(config: &Config) -> Result<YamlFileStore> {
    if config.store.backend == StoreBackend::Memory {
        return Err(Error::Config(
            "The memory store backend has nothing to inspect outside a run".to_string(),
        ));
    }
    Ok(YamlFileStore::new(config.resolve(&config.store.state)))
}

fn print_yaml(value: &Value) -> Result<()> {
    let text = serde_yaml::to_string(value)?;
    print!("{}", text);
    Ok(())
}
