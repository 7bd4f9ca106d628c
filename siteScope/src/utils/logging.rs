//! Structured logging setup plus lightweight per-operation timing.
//!
//! Timing guards always maintain the call stack; histograms are only
//! recorded once `init_logging` has switched timing on.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use parking_lot::RwLock;
use tracing::Level;
use tracing_subscriber::{prelude::*, EnvFilter};
use tracing_timing::{Builder, Histogram};

// Histogram bounds: 1ns to 60s, 3 significant figures
const HISTOGRAM_MAX_NS: u64 = 60_000_000_000;
const HISTOGRAM_SIGFIG: u8 = 3;

/// Buckets for the timing report.
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum OperationCategory {
    DataLoad {
        subcategory: DataLoadType,
    },
    SpatialFilter,
    Rendering {
        subcategory: RenderType,
    },
    PdfAssembly,
    Request,
    Other,
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum DataLoadType {
    RemoteFetch,
    LocalRead,
    Parse,
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum RenderType {
    Map,
    Chart,
    Table,
}

impl OperationCategory {
    pub fn as_str(&self) -> String {
        match self {
            OperationCategory::DataLoad { subcategory } => {
                format!("Data Load - {}", match subcategory {
                    DataLoadType::RemoteFetch => "Remote Fetch",
                    DataLoadType::LocalRead => "Local Read",
                    DataLoadType::Parse => "Parse",
                })
            },
            OperationCategory::SpatialFilter => "Spatial Filter".to_string(),
            OperationCategory::Rendering { subcategory } => {
                format!("Rendering - {}", match subcategory {
                    RenderType::Map => "Map",
                    RenderType::Chart => "Chart",
                    RenderType::Table => "Table",
                })
            },
            OperationCategory::PdfAssembly => "PDF Assembly".to_string(),
            OperationCategory::Request => "Request".to_string(),
            OperationCategory::Other => "Other Operations".to_string(),
        }
    }
}

thread_local! {
    static TIMING_STACK: RefCell<Vec<(String, OperationCategory, Instant)>> = RefCell::new(Vec::new());
}

lazy_static! {
    static ref TIMING_ENABLED: AtomicBool = AtomicBool::new(false);
    static ref FUNCTION_TIMINGS: Arc<RwLock<HashMap<String, Histogram<u64>>>> = Arc::new(RwLock::new(HashMap::new()));
    static ref CATEGORY_TIMINGS: Arc<RwLock<HashMap<OperationCategory, Histogram<u64>>>> = Arc::new(RwLock::new(HashMap::new()));
    static ref HIERARCHICAL_TIMINGS: Arc<RwLock<HashMap<String, (Duration, usize, Vec<String>)>>> = Arc::new(RwLock::new(HashMap::new()));
}

pub struct TimingGuard {
    function_name: String,
    category: OperationCategory,
    start: Instant,
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        record_timing_end(&self.function_name, duration, &self.category);
    }
}

pub fn start_timing(function_name: &str, category: OperationCategory) -> TimingGuard {
    let guard = TimingGuard {
        function_name: function_name.to_string(),
        category: category.clone(),
        start: Instant::now(),
    };

    TIMING_STACK.with(|stack| {
        stack.borrow_mut().push((function_name.to_string(), category, Instant::now()));
    });

    guard
}

fn new_histogram() -> Option<Histogram<u64>> {
    Histogram::<u64>::new_with_bounds(1, HISTOGRAM_MAX_NS, HISTOGRAM_SIGFIG).ok()
}

fn record_timing_end(function_name: &str, duration: Duration, category: &OperationCategory) {
    // The stack is pushed unconditionally, so it is popped unconditionally too
    let parent = TIMING_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        stack.pop();
        stack.last().map(|(name, _, _)| name.clone())
    });

    if !is_timing_enabled() {
        return;
    }

    {
        let mut hierarchical = HIERARCHICAL_TIMINGS.write();
        let entry = hierarchical
            .entry(function_name.to_string())
            .or_insert((Duration::from_nanos(0), 0, Vec::new()));

        entry.0 += duration;
        entry.1 += 1;

        if let Some(parent_name) = parent {
            if !entry.2.contains(&parent_name) {
                entry.2.push(parent_name);
            }
        }
    }

    let duration_ns = duration.as_nanos().min(HISTOGRAM_MAX_NS as u128) as u64;

    // Record function-specific timing
    {
        let mut timings = FUNCTION_TIMINGS.write();
        if !timings.contains_key(function_name) {
            if let Some(histogram) = new_histogram() {
                timings.insert(function_name.to_string(), histogram);
            }
        }
        if let Some(histogram) = timings.get_mut(function_name) {
            let _ = histogram.record(duration_ns.max(1));
        }
    }

    // Record category timing
    {
        let mut category_timings = CATEGORY_TIMINGS.write();
        if !category_timings.contains_key(category) {
            if let Some(histogram) = new_histogram() {
                category_timings.insert(category.clone(), histogram);
            }
        }
        if let Some(histogram) = category_timings.get_mut(category) {
            let _ = histogram.record(duration_ns.max(1));
        }
    }
}

pub fn init_logging(enable_timing: bool, debug_logging: bool) -> anyhow::Result<()> {
    TIMING_ENABLED.store(enable_timing, Ordering::SeqCst);

    let crate_directive = if debug_logging { "sitescope=trace" } else { "sitescope=debug" };
    let env_filter = EnvFilter::from_default_env()
        .add_directive(Level::INFO.into())
        .add_directive(crate_directive.parse()?);

    if enable_timing {
        let histogram = || {
            Histogram::<u64>::new_with_bounds(1, HISTOGRAM_MAX_NS, HISTOGRAM_SIGFIG)
                .expect("constant histogram bounds are valid")
        };

        let timing_layer = Builder::default().layer(histogram);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .with(timing_layer.boxed());

        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty());

        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

pub fn is_timing_enabled() -> bool {
    TIMING_ENABLED.load(Ordering::SeqCst)
}

/// Number of calls recorded for `function_name` since timing was enabled.
pub fn recorded_calls(function_name: &str) -> usize {
    HIERARCHICAL_TIMINGS
        .read()
        .get(function_name)
        .map(|(_, count, _)| *count)
        .unwrap_or(0)
}

/// Prints per-function and per-category timings gathered while timing was on.
pub fn print_timing_report() {
    if !is_timing_enabled() {
        return;
    }

    println!("\nsitescope timing report");
    println!("{:<32} {:>7} {:>10} {:>10}", "operation", "calls", "total ms", "avg ms");

    let hierarchical = HIERARCHICAL_TIMINGS.read();
    let mut functions: Vec<_> = hierarchical.iter().collect();
    functions.sort_by(|a, b| b.1 .0.cmp(&a.1 .0));
    for (name, (total, calls, parents)) in functions {
        let total_ms = total.as_secs_f64() * 1000.0;
        println!(
            "{:<32} {:>7} {:>10.2} {:>10.2}",
            name,
            calls,
            total_ms,
            total_ms / (*calls).max(1) as f64
        );
        if !parents.is_empty() {
            println!("  within {}", parents.join(", "));
        }
    }

    let category_timings = CATEGORY_TIMINGS.read();
    let totals: Vec<(String, f64, &Histogram<u64>)> = category_timings
        .iter()
        .map(|(category, hist)| (category.as_str(), hist.mean() * hist.len() as f64, hist))
        .collect();
    let grand_total: f64 = totals.iter().map(|(_, total, _)| total).sum();
    if grand_total <= 0.0 {
        return;
    }

    let mut totals = totals;
    totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    println!("\n{:<32} {:>7} {:>10} {:>10}", "category", "share", "p95 ms", "max ms");
    for (name, total, hist) in totals {
        println!(
            "{:<32} {:>6.1}% {:>10.2} {:>10.2}",
            name,
            total / grand_total * 100.0,
            hist.value_at_quantile(0.95) as f64 / 1_000_000.0,
            hist.max() as f64 / 1_000_000.0
        );
    }
}
