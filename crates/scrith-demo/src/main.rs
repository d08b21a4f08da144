mod app;

use std::process::ExitCode;

use anyhow::Result;
use scrith_engine::config::DemoConfig;
use scrith_engine::core::{Phase, Scheduler, Signal, Task, TaskGraph};
use scrith_engine::logging::{LoggingConfig, init_logging, trace_fatal};

use app::TechDemo;

/// Wraps a fallible step; failures are traced and become `Signal::Error`.
fn task(name: &'static str, f: fn(&mut TechDemo) -> Result<()>) -> Task<TechDemo> {
    Task::new(name, move |demo: &mut TechDemo| match f(demo) {
        Ok(()) => Signal::Forward,
        Err(e) => {
            trace_fatal(name, &e);
            Signal::Error
        }
    })
}

fn platform_layer() -> TaskGraph<TechDemo> {
    TaskGraph::new()
        .block(Phase::Init, task("OsInit", TechDemo::os_init))
        .block(Phase::Runtime, Task::new("OsUpdate", TechDemo::os_update))
        .block(
            Phase::Runtime,
            Task::new("OsFrame", |demo: &mut TechDemo| match demo.os_frame() {
                Ok(signal) => signal,
                Err(e) => {
                    trace_fatal("OsFrame", &e);
                    Signal::Error
                }
            }),
        )
        .block(Phase::Destroy, task("OsPreRelease", TechDemo::os_pre_release))
}

fn graphics_layer() -> TaskGraph<TechDemo> {
    TaskGraph::new()
        .block(Phase::Init, task("GxInit", TechDemo::gx_init))
        .block(Phase::Runtime, task("Render", TechDemo::render))
        .block(Phase::Destroy, task("GxRelease", TechDemo::gx_release))
}

fn app_layer() -> TaskGraph<TechDemo> {
    TaskGraph::new()
        .block(Phase::Init, task("OnInit", TechDemo::on_init))
        .block(Phase::Runtime, task("OnPostRender", TechDemo::on_post_render))
        .block(Phase::Destroy, task("OnRelease", TechDemo::on_release))
}

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    let config = match DemoConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    log::info!("starting with {config:?}");

    // The scene update joins the pump block so each draw sees this iteration's
    // clock and camera. The window outlives everything else, so its release
    // closes the graph.
    let graph = platform_layer()
        .then(graphics_layer())
        .then(app_layer())
        .join_front(Phase::Runtime, task("OnUpdate", TechDemo::on_update))
        .block(Phase::Destroy, task("OsRelease", TechDemo::os_release));

    let mut demo = TechDemo::new(config);
    let outcome = Scheduler::new(graph).run(&mut demo);

    match outcome {
        Signal::Error => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}
