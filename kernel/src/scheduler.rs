//! Scheduler loop
//!
//! The kernel's main thread. Each cycle walks
//! `Idle -> DispatchTick -> DispatchInput -> Composite -> Present -> Idle`:
//! timer ticks first, then mouse and keyboard, then the post-dispatch pass
//! (kernel requests, redraws, reaping), then compositing and presentation.
//! The table is never mutated while a dispatch pass iterates it; kills asked
//! for mid-cycle are applied once, after all dispatch steps.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use crate::compositor::Compositor;
use crate::config::KernelConfig;
use crate::error::KernelError;
use crate::graphics::Display;
use crate::input::InputRouter;
use crate::message::{KernelRequest, KeyCode, Message, MouseInfo};
use crate::process::{Pid, Process, ProcessInfo, ProcessTable};

/// Where the loop is within the current cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    DispatchTick,
    DispatchInput,
    Composite,
    Present,
}

/// Device events gathered since the previous cycle
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleInput {
    /// Timer ticks elapsed; any number of them produces one `Tick` pass
    pub ticks: u64,
    /// Latest mouse snapshot in screen coordinates
    pub mouse: Option<MouseInfo>,
    pub keys: Vec<KeyCode>,
}

impl CycleInput {
    pub fn is_empty(&self) -> bool {
        self.ticks == 0 && self.mouse.is_none() && self.keys.is_empty()
    }
}

/// Event sources the loop drains every cycle
pub trait Devices {
    /// Take everything that arrived since the last call
    fn poll(&mut self) -> CycleInput;

    /// Block until the next interrupt
    fn wait(&mut self);
}

pub struct Scheduler<D: Display> {
    pub(crate) config: KernelConfig,
    pub(crate) table: ProcessTable,
    pub(crate) compositor: Compositor<D>,
    router: InputRouter,
    state: LoopState,
    ticks: u64,
    cycles: u64,
}

impl<D: Display> Scheduler<D> {
    /// Build the scheduler context. The screen size is taken from `display`.
    pub fn new(display: D, mut config: KernelConfig) -> Result<Self, KernelError> {
        let (width, height) = display.size();
        config.screen_width = width;
        config.screen_height = height;
        crate::logger::set_level(config.log_level);

        let compositor = Compositor::new(display, &config)?;
        let table = ProcessTable::new(&config);
        crate::log!(
            "[SCHED] Ready: {}x{} screen, {} Hz, up to {} processes",
            width,
            height,
            config.tick_hz,
            config.max_processes
        );

        Ok(Scheduler {
            config,
            table,
            compositor,
            router: InputRouter::new(),
            state: LoopState::Idle,
            ticks: 0,
            cycles: 0,
        })
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut ProcessTable {
        &mut self.table
    }

    pub fn compositor(&self) -> &Compositor<D> {
        &self.compositor
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Timer ticks seen since boot
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Completed cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn start(&mut self, procedure: Box<dyn Process>, info: ProcessInfo) -> Result<Pid, KernelError> {
        self.table.start(procedure, info)
    }

    pub fn kill(&mut self, pid: Pid) -> bool {
        self.table.kill(pid)
    }

    /// Run one shell command line outside of any process
    pub fn execute(&mut self, line: &str) -> String {
        crate::shell::execute(self, line)
    }

    /// Run one full cycle over `input`
    pub fn cycle(&mut self, input: CycleInput) {
        self.state = LoopState::DispatchTick;
        self.ticks += input.ticks;
        self.table.set_ticks(self.ticks);
        for pid in self.table.take_resets() {
            self.table.deliver(pid, &Message::Init);
        }
        if input.ticks > 0 {
            self.router.route_tick(&mut self.table);
        }

        self.state = LoopState::DispatchInput;
        if let Some(mouse) = input.mouse {
            self.compositor.set_cursor(mouse.position);
            self.router.route_mouse(&mut self.table, mouse);
        }
        for key in input.keys {
            self.router.route_key(&mut self.table, key);
        }

        self.finish_dispatch();

        self.state = LoopState::Composite;
        self.compositor.composite(&self.table);

        self.state = LoopState::Present;
        self.compositor.present();

        self.state = LoopState::Idle;
        self.cycles += 1;
    }

    /// Post-dispatch pass: the only place the table changes shape
    fn finish_dispatch(&mut self) {
        self.apply_requests();

        for pid in self.table.take_redraws() {
            self.table.deliver(pid, &Message::Draw);
        }

        let reaped = self.table.reap();
        if reaped > 0 {
            crate::log_debug!("[SCHED] Reaped {} process(es)", reaped);
        }

        for rect in self.table.take_damage() {
            self.compositor.invalidate(rect);
        }
    }

    fn apply_requests(&mut self) {
        for (pid, request) in self.table.take_requests() {
            match request {
                KernelRequest::Command(line) => {
                    let output = crate::shell::execute(self, &line);
                    if !output.is_empty() {
                        self.table.push_reply(pid, output);
                    }
                }
                KernelRequest::Start(name) => {
                    if let Err(e) = crate::programs::start(&mut self.table, &name) {
                        crate::log_warn!("[SCHED] Process {} could not start '{}': {}", pid, name, e);
                    }
                }
                KernelRequest::Toggle(name) => {
                    if let Err(e) = crate::programs::toggle(&mut self.table, &name) {
                        crate::log_warn!("[SCHED] Process {} could not toggle '{}': {}", pid, name, e);
                    }
                }
            }
        }
    }

    /// Push changed configuration into the running subsystems
    pub(crate) fn apply_config(&mut self) {
        crate::logger::set_level(self.config.log_level);
        self.compositor.set_cursor_visible(self.config.draw_mouse);
        self.compositor.set_background(self.config.background);
        self.table.set_background(self.config.background);
        self.table.set_max_processes(self.config.max_processes);
    }

    /// The kernel main loop; never returns
    pub fn run<V: Devices>(&mut self, devices: &mut V) -> ! {
        crate::log!("[SCHED] Entering main loop with {} process(es)", self.table.len());
        loop {
            let input = devices.poll();
            if input.is_empty() && !self.compositor.needs_composite() {
                devices.wait();
                continue;
            }
            self.cycle(input);
        }
    }
}
