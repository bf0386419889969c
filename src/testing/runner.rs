//! Suite runner
//!
//! Runs case groups in priority order. A group whose preconditions are not
//! met is aborted before any of its cases execute; inside a group each case
//! stands on its own.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tracing::{error, info, warn};

use super::config::TestCase;
use super::executor::execute_case;
use super::loader::load_cases;
use crate::common::config::{Config, GroupConfig};
use crate::common::{Error, FailureKind, Result};
use crate::context::RunContext;
use crate::http::Dispatcher;

/// How a single case ended
#[derive(Debug, Clone, PartialEq)]
pub enum CaseOutcome {
    Passed,
    /// An assertion did not hold
    Failed(String),
    /// Configuration, transport or parse problem
    Errored { kind: FailureKind, message: String },
    /// Not executed
    Skipped(String),
}

/// Result of one case
#[derive(Debug, Clone)]
pub struct CaseResult {
    pub case_id: String,
    pub title: String,
    pub outcome: CaseOutcome,
    pub elapsed: Option<Duration>,
}

/// Result of one group
#[derive(Debug, Clone)]
pub struct GroupResult {
    pub name: String,
    pub cases: Vec<CaseResult>,
    /// Set when the group could not start (failed precondition, unreadable case file)
    pub aborted: Option<String>,
}

/// Per-outcome tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.errored + self.skipped
    }
}

impl GroupResult {
    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for case in &self.cases {
            match case.outcome {
                CaseOutcome::Passed => counts.passed += 1,
                CaseOutcome::Failed(_) => counts.failed += 1,
                CaseOutcome::Errored { .. } => counts.errored += 1,
                CaseOutcome::Skipped(_) => counts.skipped += 1,
            }
        }
        counts
    }
}

/// Result of a whole run
#[derive(Debug, Clone, Default)]
pub struct SuiteResult {
    pub groups: Vec<GroupResult>,
    pub interrupted: bool,
}

impl SuiteResult {
    pub fn counts(&self) -> Counts {
        self.groups.iter().fold(Counts::default(), |mut acc, g| {
            let c = g.counts();
            acc.passed += c.passed;
            acc.failed += c.failed;
            acc.errored += c.errored;
            acc.skipped += c.skipped;
            acc
        })
    }

    /// True when nothing failed, errored or was aborted
    pub fn passed(&self) -> bool {
        let counts = self.counts();
        counts.failed == 0
            && counts.errored == 0
            && !self.interrupted
            && self.groups.iter().all(|g| g.aborted.is_none())
    }

    /// The run's exit result: `Ok` only when it [`passed`](Self::passed)
    pub fn check(&self) -> Result<()> {
        if self.interrupted {
            return Err(Error::Interrupted);
        }
        if !self.passed() {
            let counts = self.counts();
            return Err(Error::RunFailed {
                failed: counts.total() - counts.passed,
                total: counts.total(),
            });
        }
        Ok(())
    }
}

/// A group ready to run: its settings plus the resolved case file path
#[derive(Debug, Clone)]
pub struct GroupPlan {
    pub name: String,
    pub cases_path: PathBuf,
    pub requires: Vec<String>,
    pub fixtures: Vec<String>,
}

impl GroupPlan {
    fn from_config(config: &Config, group: &GroupConfig) -> Self {
        Self {
            name: group.name.clone(),
            cases_path: config.resolve(&group.cases),
            requires: group.requires.clone(),
            fixtures: group.fixtures.clone(),
        }
    }

    /// Load this group's cases
    pub fn load(&self) -> Result<Vec<TestCase>> {
        load_cases(&self.cases_path, &self.name)
    }
}

/// Groups to run, in execution order, optionally restricted to `only`
pub fn plan_groups(config: &Config, only: &[String]) -> Result<Vec<GroupPlan>> {
    for name in only {
        if !config.groups.iter().any(|g| &g.name == name) {
            return Err(Error::Config(format!("Unknown group '{}'", name)));
        }
    }

    Ok(config
        .ordered_groups()
        .into_iter()
        .filter(|g| only.is_empty() || only.contains(&g.name))
        .map(|g| GroupPlan::from_config(config, g))
        .collect())
}

/// Cooperative stop flag checked between cases
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Check a group's preconditions against the run context
pub fn check_preconditions(ctx: &RunContext, plan: &GroupPlan) -> Result<()> {
    let resolver = ctx.resolver();
    for name in &plan.requires {
        resolver.require(name)?;
    }
    for path in &plan.fixtures {
        resolver.require_fixture(path)?;
    }
    Ok(())
}

/// Run every case of one group
pub async fn run_group(
    ctx: &mut RunContext,
    dispatcher: &dyn Dispatcher,
    plan: &GroupPlan,
    cases: &[TestCase],
    stop: &StopSignal,
) -> GroupResult {
    println!(
        "\n{} {} ({} cases)",
        "Running Group:".blue().bold(),
        plan.name.white().bold(),
        cases.len()
    );

    if let Err(e) = check_preconditions(ctx, plan) {
        error!("Group '{}' aborted: {}", plan.name, e);
        println!("  {} {}", "✗".red(), e.to_string().red());
        let reason = e.to_string();
        return GroupResult {
            name: plan.name.clone(),
            cases: cases
                .iter()
                .map(|c| skipped(c, &reason))
                .collect(),
            aborted: Some(reason),
        };
    }
    info!("Group '{}' preconditions satisfied", plan.name);

    let mut results = Vec::with_capacity(cases.len());
    for case in cases {
        if stop.is_stopped() {
            results.push(skipped(case, "run interrupted"));
            continue;
        }

        let outcome = match execute_case(ctx, dispatcher, case).await {
            Ok(report) => {
                print_case(case, &CaseOutcome::Passed, Some(report.elapsed));
                results.push(CaseResult {
                    case_id: case.case_id.clone(),
                    title: case.title.clone(),
                    outcome: CaseOutcome::Passed,
                    elapsed: Some(report.elapsed),
                });
                continue;
            }
            Err(e) => outcome_for(&e),
        };

        match &outcome {
            CaseOutcome::Failed(msg) => warn!("Case {} failed: {}", case.case_id, msg),
            CaseOutcome::Errored { kind, message } => {
                error!("Case {} errored ({}): {}", case.case_id, kind, message)
            }
            CaseOutcome::Passed | CaseOutcome::Skipped(_) => {}
        }
        print_case(case, &outcome, None);
        results.push(CaseResult {
            case_id: case.case_id.clone(),
            title: case.title.clone(),
            outcome,
            elapsed: None,
        });
    }

    GroupResult {
        name: plan.name.clone(),
        cases: results,
        aborted: None,
    }
}

/// Run the planned groups in order
pub async fn run_suite(
    ctx: &mut RunContext,
    dispatcher: &dyn Dispatcher,
    plans: &[GroupPlan],
    stop: &StopSignal,
) -> SuiteResult {
    info!("=============== Test run started ===============");
    let mut suite = SuiteResult::default();

    for plan in plans {
        let cases = match plan.load() {
            Ok(cases) => cases,
            Err(e) => {
                error!("Group '{}' could not be loaded: {}", plan.name, e);
                println!(
                    "\n{} {}\n  {} {}",
                    "Running Group:".blue().bold(),
                    plan.name.white().bold(),
                    "✗".red(),
                    e.to_string().red()
                );
                suite.groups.push(GroupResult {
                    name: plan.name.clone(),
                    cases: Vec::new(),
                    aborted: Some(e.to_string()),
                });
                continue;
            }
        };

        if stop.is_stopped() {
            suite.groups.push(GroupResult {
                name: plan.name.clone(),
                cases: cases.iter().map(|c| skipped(c, "run interrupted")).collect(),
                aborted: None,
            });
            continue;
        }

        suite
            .groups
            .push(run_group(ctx, dispatcher, plan, &cases, stop).await);
    }

    suite.interrupted = stop.is_stopped();
    info!("=============== Test run finished ===============");
    suite
}

/// Map an execution error to a case outcome
pub fn outcome_for(error: &Error) -> CaseOutcome {
    match error.kind() {
        FailureKind::Assertion => CaseOutcome::Failed(error.to_string()),
        FailureKind::Interrupted => CaseOutcome::Skipped(error.to_string()),
        kind @ (FailureKind::Configuration | FailureKind::Transport) => CaseOutcome::Errored {
            kind,
            message: error.to_string(),
        },
    }
}

fn skipped(case: &TestCase, reason: &str) -> CaseResult {
    CaseResult {
        case_id: case.case_id.clone(),
        title: case.title.clone(),
        outcome: CaseOutcome::Skipped(reason.to_string()),
        elapsed: None,
    }
}

fn print_case(case: &TestCase, outcome: &CaseOutcome, elapsed: Option<Duration>) {
    let label = if case.title.is_empty() {
        case.case_id.clone()
    } else {
        format!("{} - {}", case.case_id, case.title)
    };

    match outcome {
        CaseOutcome::Passed => {
            let timing = elapsed
                .map(|d| format!(" ({}ms)", d.as_millis()))
                .unwrap_or_default();
            println!("  {} {}{}", "✓".green(), label, timing.dimmed());
        }
        CaseOutcome::Failed(msg) => {
            println!("  {} {}", "✗".red(), label);
            println!("      {}", msg.red());
        }
        CaseOutcome::Errored { kind, message } => {
            println!("  {} {} [{}]", "!".yellow().bold(), label, kind);
            println!("      {}", message.yellow());
        }
        CaseOutcome::Skipped(reason) => {
            println!("  {} {} ({})", "-".dimmed(), label, reason.dimmed());
        }
    }
}

/// Print the end-of-run summary
pub fn print_summary(suite: &SuiteResult) {
    println!("\n{}", "Summary:".cyan());
    for group in &suite.groups {
        let c = group.counts();
        let status = if group.aborted.is_some() {
            "aborted".red().to_string()
        } else if c.failed + c.errored == 0 {
            "ok".green().to_string()
        } else {
            "failed".red().to_string()
        };
        println!(
            "  {:<20} {} passed, {} failed, {} errored, {} skipped [{}]",
            group.name, c.passed, c.failed, c.errored, c.skipped, status
        );
    }

    let total = suite.counts();
    if suite.interrupted {
        println!("\n{}", "Run interrupted".yellow().bold());
    }
    if suite.passed() {
        println!(
            "\n{} {}\n",
            "✓".green().bold(),
            format!("All {} cases passed", total.total()).green().bold()
        );
    } else {
        println!(
            "\n{} {}\n",
            "✗".red().bold(),
            format!(
                "{} passed, {} failed, {} errored, {} skipped",
                total.passed, total.failed, total.errored, total.skipped
            )
            .red()
            .bold()
        );
    }
}
