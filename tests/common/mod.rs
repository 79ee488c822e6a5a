/*!
 * Shared test harness
 * A kernel preloaded with the built-in programs, plus room for ad-hoc ones
 */

#![allow(dead_code)]

use std::sync::Arc;
use userprog_kernel::{
    programs, ArgumentVector, EntryTable, ExitStatus, ImageBuilder, KernelConfig, MemImageStore,
    Pid, ProcessManager, UserProgram, KERNEL_PID,
};

pub struct Harness {
    pub manager: ProcessManager,
    pub images: MemImageStore,
    pub entries: EntryTable,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> Self {
        let images = programs::images().expect("built-in images");
        let entries = programs::entries();
        let manager = ProcessManager::builder()
            .with_config(config)
            .with_image_store(Arc::new(images.clone()))
            .with_entries(entries.clone())
            .build();
        Self {
            manager,
            images,
            entries,
        }
    }

    /// Make `program` executable as `name`, e.g. `"probe.coff"`
    pub fn install<P>(&self, name: &str, program: P)
    where
        P: UserProgram + 'static,
    {
        let entry = name.trim_end_matches(".coff");
        self.entries.register(entry, Arc::new(program));
        self.images
            .insert_image(name, &ImageBuilder::new(entry).build())
            .expect("encode image");
    }

    pub fn exec(&self, name: &str, args: &[&str]) -> Pid {
        self.manager
            .exec(KERNEL_PID, name, &ArgumentVector::from_strs(args))
            .expect("exec")
    }

    /// exec from the kernel and join the result
    pub fn run_to_exit(&self, name: &str, args: &[&str]) -> ExitStatus {
        let pid = self.exec(name, args);
        self.manager.join(KERNEL_PID, pid).expect("join")
    }

    pub fn output(&self) -> String {
        self.manager.console().output_string()
    }
}
