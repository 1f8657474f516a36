use anyhow::Context;
use std::env;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock, Weak};
use symreg::config::{ConfigManager, ProcessConfig};
use symreg::grammar::{DofGrammar, GrammarRegistry};
use symreg::report::RunReport;
use symreg::{
    DofVectorFitness, ErrorListener, ManagerContext, ManagerLifecycleController, RandomProbeEngine,
    SymregError,
};

type Controller = ManagerLifecycleController<RandomProbeEngine>;

/// Register one grammar per dof; every dof shares the rule text and differs
/// in its number of variables
fn setup_grammars(process: &ProcessConfig) -> GrammarRegistry {
    let mut registry = GrammarRegistry::new();
    for (dof, &num_vars) in process.dof_arities.iter().enumerate() {
        let grammar = DofGrammar::new(num_vars, process.grammar.as_str());
        log::info!("Grammar of dof {} ({} vars): {}", dof, num_vars, grammar.text);
        registry.register(process.manager_id, dof, grammar);
    }
    registry
}

fn log_individuals(best: &[symreg::Individual]) {
    log::info!("**************************************************");
    log::info!("Found {} fit individuals: ", best.len());
    for (ind_idx, ind) in best.iter().enumerate() {
        log::info!(">>>>>>>");
        log::info!("Individual #{} ({}) has {} dofs", ind_idx, ind, ind.num_dofs());
        for (dof, expr) in ind.expressions.iter().enumerate() {
            log::info!("Individual #{} dof {} expression is: {}", ind_idx, dof, expr);
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Usage: symreg [config.toml] [report.json]
    let args: Vec<String> = env::args().collect();
    let config_path = args.get(1).map(PathBuf::from);
    let report_path = args.get(2).map(PathBuf::from);

    let config_manager = ConfigManager::new();
    config_manager
        .load_layered(config_path.as_ref())
        .context("Failed to load configuration")?;
    let config = config_manager.get();
    for manifest in config.manifests() {
        for field in &manifest.fields {
            log::debug!(
                "[{}] {} ({}, default {}): {}",
                manifest.section,
                field.name,
                field.field_type,
                field.default,
                field.description
            );
        }
    }
    let manager_id = config.process.manager_id;
    let grace = config.lifecycle.stop_grace();

    let registry = Arc::new(setup_grammars(&config.process));
    let report_registry = Arc::clone(&registry);

    // Broken candidates are reported here; the run is stopped on the first one
    let slot: Arc<OnceLock<Weak<Controller>>> = Arc::new(OnceLock::new());
    let listener: Arc<dyn ErrorListener> = {
        let slot = Arc::clone(&slot);
        Arc::new(move |msg: &str, cause: &SymregError| {
            log::error!("{}: {}", msg, cause);
            if let Some(controller) = slot.get().and_then(Weak::upgrade) {
                controller.stop(grace, None);
            }
        })
    };

    let fitness = Arc::new(DofVectorFitness::from_config(
        Arc::clone(&registry),
        Arc::clone(&listener),
        &config.fitness,
    ));
    let context = Arc::new(
        ManagerContext::new(manager_id, registry, fitness).with_error_listener(listener),
    );
    let engine = RandomProbeEngine::new(context, config.process.clone());
    let controller = Arc::new(Controller::from_config(
        engine,
        &config.lifecycle,
        config.fitness.target_fitness,
    ));
    let _ = slot.set(Arc::downgrade(&controller));

    let started_at = chrono::Utc::now();
    controller.start().context("Failed to start the manager")?;

    controller.await_termination();

    controller.stop(grace, None);

    let best = controller.get_best_fit_ind();
    log_individuals(&best);

    if let Some(path) = report_path {
        let report = RunReport::new(manager_id, started_at, config.fitness.target_fitness, best)
            .with_grammars(&report_registry);
        log::info!("{}", report.summary);
        report
            .write_json(&path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    Ok(())
}
