/*!
 * Userprog Kernel - Main Entry Point
 *
 * Boots a root user program and runs until every process has exited or
 * the root halts the machine.
 *
 * Usage: `kernel [program.coff [args...]]` (default `exec_test.coff`)
 */

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use userprog_kernel::{
    init_tracing, programs, ArgumentVector, DirImageStore, ImageStore, KernelConfig,
    LayeredImageStore, ProcessManager,
};

const DEFAULT_PROGRAM: &str = "exec_test.coff";

fn main() -> anyhow::Result<()> {
    // Initialize structured tracing
    init_tracing();

    // Echo by default here; KERNEL_CONSOLE_ECHO=0 turns it off
    let config = KernelConfig::from_env_over(KernelConfig::default().with_console_echo(true))
        .context("loading kernel configuration")?;
    info!(?config, "Userprog kernel starting...");

    let mut store = LayeredImageStore::new();
    if let Some(dir) = &config.image_dir {
        info!(dir = %dir.display(), "Searching host directory for images");
        store = store.with_layer(Arc::new(DirImageStore::new(dir.clone())));
    }
    let builtins = programs::images().context("building built-in images")?;
    store = store.with_layer(Arc::new(builtins));

    let manager = ProcessManager::builder()
        .with_config(config)
        .with_image_store(Arc::new(store) as Arc<dyn ImageStore>)
        .with_entries(programs::entries())
        .build();

    let mut argv = std::env::args().skip(1);
    let program = argv.next().unwrap_or_else(|| DEFAULT_PROGRAM.to_string());
    let args: ArgumentVector = argv.collect();

    let shutdown = manager
        .run(&program, &args)
        .with_context(|| format!("starting {program}"))?;

    let stats = manager.stats();
    info!(
        stats = %serde_json::to_string(&stats).unwrap_or_default(),
        "Kernel stopped"
    );

    let code = shutdown.status.map(|s| s.code).unwrap_or(0);
    std::process::exit(code);
}
