//! Process table
//!
//! Owns every live process. Ids come from a monotonic counter, framebuffers
//! are accounted against a byte budget, and focus is stored as an id that is
//! checked against the table on every read so it can never dangle.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use super::{draw_chrome, Clock, Geometry, Pid, Process, ProcessEntity, ProcessInfo, WindowKind};
use crate::config::KernelConfig;
use crate::error::KernelError;
use crate::graphics::{Framebuffer, Point, Rect};
use crate::message::{KernelRequest, Message, Response};

pub struct ProcessTable {
    processes: Vec<ProcessEntity>,
    next_pid: Pid,
    focus: Option<Pid>,
    screen: Rect,
    background: u32,
    clock: Clock,
    max_processes: usize,
    framebuffer_budget: usize,
    framebuffer_bytes: usize,
    /// Processes that answered `Kill`, destroyed by `reap`
    doomed: Vec<Pid>,
    /// Kernel calls queued during dispatch
    requests: Vec<(Pid, KernelRequest)>,
    /// Screen areas uncovered by destroyed or newly placed windows
    exposed: Vec<Rect>,
}

impl ProcessTable {
    pub fn new(config: &KernelConfig) -> Self {
        Self {
            processes: Vec::new(),
            next_pid: 0,
            focus: None,
            screen: Rect::new(0, 0, config.screen_width, config.screen_height),
            background: config.background,
            clock: Clock { ticks: 0, hz: config.tick_hz },
            max_processes: config.max_processes,
            framebuffer_budget: config.framebuffer_budget,
            framebuffer_bytes: 0,
            doomed: Vec::new(),
            requests: Vec::new(),
            exposed: Vec::new(),
        }
    }

    /// Create a process and deliver `Init` to it.
    ///
    /// `Fullscreen` processes are resized to the screen; their requested depth
    /// is kept. Nothing is allocated on failure.
    pub fn start(&mut self, procedure: Box<dyn Process>, info: ProcessInfo) -> Result<Pid, KernelError> {
        if self.processes.len() >= self.max_processes {
            crate::log_warn!("[PROC] Cannot start '{}': table full", info.title);
            return Err(KernelError::TableFull);
        }

        let geometry = match info.kind {
            WindowKind::Fullscreen => Geometry::new(
                self.screen.w,
                self.screen.h,
                self.screen.x,
                self.screen.y,
                info.geometry.depth,
            ),
            _ => info.geometry,
        };
        if geometry.width == 0 || geometry.height == 0 {
            return Err(KernelError::InvalidGeometry);
        }

        let bytes = Framebuffer::bytes_for(geometry.width, geometry.height)
            .ok_or(KernelError::OutOfMemory)?;
        let within_budget = self
            .framebuffer_bytes
            .checked_add(bytes)
            .map_or(false, |total| total <= self.framebuffer_budget);
        if !within_budget {
            crate::log_warn!(
                "[PROC] Cannot start '{}': {} bytes over framebuffer budget",
                info.title,
                bytes
            );
            return Err(KernelError::OutOfMemory);
        }

        self.processes
            .try_reserve(1)
            .map_err(|_| KernelError::OutOfMemory)?;
        let mut framebuffer = Framebuffer::try_new(geometry.width, geometry.height, self.background)?;
        if info.kind == WindowKind::Windowed {
            draw_chrome(&mut framebuffer, &info.title);
        }

        let pid = self.next_pid;
        self.next_pid += 1;
        self.framebuffer_bytes += bytes;
        self.processes.push(ProcessEntity {
            pid,
            title: info.title,
            kind: info.kind,
            geometry,
            framebuffer,
            procedure,
            replies: VecDeque::new(),
            dirty: true,
            reset_pending: false,
            redraw_pending: false,
        });

        crate::log_debug!(
            "[PROC] Started process {} ({}, {}x{} at {},{} depth {})",
            pid,
            info.kind.as_str(),
            geometry.width,
            geometry.height,
            geometry.left,
            geometry.top,
            geometry.depth
        );

        self.deliver(pid, &Message::Init);
        Ok(pid)
    }

    /// Send `Kill`, then destroy the process. Returns false for unknown ids.
    pub fn kill(&mut self, pid: Pid) -> bool {
        let Some(idx) = self.index_of(pid) else {
            crate::log_debug!("[PROC] Kill: no process {}", pid);
            return false;
        };

        let clock = self.clock;
        let _ = self.processes[idx].deliver(&Message::Kill, clock, &mut self.requests);
        self.destroy(idx);
        true
    }

    /// Free the control block at `idx` without any further message
    fn destroy(&mut self, idx: usize) {
        let entity = self.processes.remove(idx);
        let pid = entity.pid;
        self.framebuffer_bytes -= entity.framebuffer.size_bytes();
        self.exposed.push(entity.bounds());
        self.doomed.retain(|&p| p != pid);
        if self.focus == Some(pid) {
            self.focus = None;
        }
        crate::log_debug!("[PROC] Process {} ({}) destroyed", pid, entity.title);
    }

    pub fn lookup(&self, pid: Pid) -> Option<&ProcessEntity> {
        self.processes.iter().find(|p| p.pid == pid)
    }

    pub(crate) fn lookup_mut(&mut self, pid: Pid) -> Option<&mut ProcessEntity> {
        self.processes.iter_mut().find(|p| p.pid == pid)
    }

    fn index_of(&self, pid: Pid) -> Option<usize> {
        self.processes.iter().position(|p| p.pid == pid)
    }

    /// Processes in ascending depth, ties broken by id. Reverse it to walk
    /// from the topmost window down.
    pub fn iter_by_depth(&self) -> DepthOrder<'_> {
        let mut order: Vec<usize> = (0..self.processes.len()).collect();
        order.sort_by_key(|&i| (self.processes[i].geometry.depth, self.processes[i].pid));
        DepthOrder {
            processes: &self.processes,
            order,
            front: 0,
            back: self.processes.len(),
        }
    }

    /// Processes in start order
    pub fn iter(&self) -> impl Iterator<Item = &ProcessEntity> {
        self.processes.iter()
    }

    /// Ids of all live processes, in start order
    pub fn pids(&self) -> Vec<Pid> {
        self.processes.iter().map(|p| p.pid).collect()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Topmost process whose window contains `point`. Processes waiting to
    /// be reaped are transparent.
    pub fn hit_test(&self, point: Point) -> Option<Pid> {
        self.iter_by_depth()
            .rev()
            .filter(|p| !self.doomed.contains(&p.pid))
            .find(|p| p.bounds().contains(point))
            .map(|p| p.pid)
    }

    /// Focused process, if it is still alive
    pub fn focused(&self) -> Option<Pid> {
        self.focus.filter(|&pid| self.lookup(pid).is_some())
    }

    /// Give focus to `pid`. Returns false and leaves focus alone for unknown ids.
    pub fn set_focus(&mut self, pid: Pid) -> bool {
        if self.lookup(pid).is_none() {
            return false;
        }
        if self.focus != Some(pid) {
            crate::log_trace!("[PROC] Focus -> {}", pid);
        }
        self.focus = Some(pid);
        true
    }

    /// Deliver one message and act on the response. `None` if `pid` is gone
    /// or already waiting to be reaped.
    pub fn deliver(&mut self, pid: Pid, message: &Message) -> Option<Response> {
        if self.doomed.contains(&pid) {
            return None;
        }
        let idx = self.index_of(pid)?;
        let clock = self.clock;
        let background = self.background;
        let entity = &mut self.processes[idx];
        let response = entity.deliver(message, clock, &mut self.requests);
        crate::log_trace!("[PROC] {} -> {}: {:?}", message.name(), pid, response);

        match response {
            Response::Success => {}
            Response::Draw => entity.dirty = true,
            Response::Clear => {
                entity.wipe(background);
                entity.redraw_pending = true;
            }
            Response::Reset => entity.reset_pending = true,
            Response::Kill => {
                if !self.doomed.contains(&pid) {
                    self.doomed.push(pid);
                }
            }
        }
        Some(response)
    }

    /// Destroy every process that answered `Kill`. They already said
    /// goodbye, so no final `Kill` is sent. Returns how many went.
    pub fn reap(&mut self) -> usize {
        let doomed = core::mem::take(&mut self.doomed);
        let mut reaped = 0;
        for pid in doomed {
            if let Some(idx) = self.index_of(pid) {
                self.destroy(idx);
                reaped += 1;
            }
        }
        reaped
    }

    /// Processes waiting for a fresh `Init`; clears their flags
    pub(crate) fn take_resets(&mut self) -> Vec<Pid> {
        self.processes
            .iter_mut()
            .filter_map(|p| core::mem::take(&mut p.reset_pending).then_some(p.pid))
            .collect()
    }

    /// Processes waiting for `Draw`; clears their flags
    pub(crate) fn take_redraws(&mut self) -> Vec<Pid> {
        self.processes
            .iter_mut()
            .filter_map(|p| core::mem::take(&mut p.redraw_pending).then_some(p.pid))
            .collect()
    }

    /// Screen regions that changed since the last call: windows that drew,
    /// plus areas left behind by destroyed windows
    pub(crate) fn take_damage(&mut self) -> Vec<Rect> {
        let mut damage = core::mem::take(&mut self.exposed);
        for p in self.processes.iter_mut().filter(|p| p.dirty) {
            p.dirty = false;
            damage.push(p.bounds());
        }
        damage
    }

    pub(crate) fn take_requests(&mut self) -> Vec<(Pid, KernelRequest)> {
        core::mem::take(&mut self.requests)
    }

    /// Hand command output to a process. False if it is gone.
    pub(crate) fn push_reply(&mut self, pid: Pid, reply: String) -> bool {
        match self.lookup_mut(pid) {
            Some(entity) => {
                entity.push_reply(reply);
                true
            }
            None => false,
        }
    }

    pub fn screen(&self) -> Rect {
        self.screen
    }

    pub fn background(&self) -> u32 {
        self.background
    }

    /// Color used for framebuffers wiped from now on
    pub fn set_background(&mut self, color: u32) {
        self.background = color;
    }

    pub fn set_max_processes(&mut self, max: usize) {
        self.max_processes = max;
    }

    pub fn max_processes(&self) -> usize {
        self.max_processes
    }

    /// Bytes currently held by process framebuffers
    pub fn framebuffer_bytes(&self) -> usize {
        self.framebuffer_bytes
    }

    pub(crate) fn set_ticks(&mut self, ticks: u64) {
        self.clock.ticks = ticks;
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Depth that places a new window above every existing `Windowed` one
    pub fn next_window_depth(&self) -> i64 {
        self.processes
            .iter()
            .filter(|p| p.kind == WindowKind::Windowed)
            .map(|p| p.geometry.depth.saturating_add(1))
            .max()
            .unwrap_or(0)
    }
}

/// Depth-ordered view over the table, see [`ProcessTable::iter_by_depth`]
pub struct DepthOrder<'a> {
    processes: &'a [ProcessEntity],
    order: Vec<usize>,
    front: usize,
    back: usize,
}

impl<'a> Iterator for DepthOrder<'a> {
    type Item = &'a ProcessEntity;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let idx = self.order[self.front];
        self.front += 1;
        Some(&self.processes[idx])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl<'a> DoubleEndedIterator for DepthOrder<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        Some(&self.processes[self.order[self.back]])
    }
}

impl<'a> ExactSizeIterator for DepthOrder<'a> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessContext;
    use alloc::rc::Rc;
    use core::cell::RefCell;

    fn boxed<F>(f: F) -> Box<dyn Process>
    where
        F: FnMut(&Message, &mut ProcessContext<'_>) -> Response + 'static,
    {
        Box::new(f)
    }

    fn idle() -> Box<dyn Process> {
        boxed(|_, _| Response::Success)
    }

    /// Asks to be killed on its first tick
    fn dies_on_tick() -> Box<dyn Process> {
        boxed(|msg, _| match msg {
            Message::Tick => Response::Kill,
            _ => Response::Success,
        })
    }

    fn windowed(depth: i64) -> ProcessInfo {
        ProcessInfo::new("win", WindowKind::Windowed, Geometry::new(100, 80, 10, 10, depth))
    }

    fn table() -> ProcessTable {
        ProcessTable::new(&KernelConfig::with_screen(320, 200))
    }

    #[test]
    fn test_start_assigns_monotonic_ids_and_kill() {
        let mut table = table();
        let tty = table.start(idle(), windowed(0)).unwrap();
        let desktop = table
            .start(idle(), ProcessInfo::new("desktop", WindowKind::Fullscreen, Geometry::new(0, 0, 0, 0, -1)))
            .unwrap();
        assert_eq!((tty, desktop), (0, 1));

        let order: Vec<Pid> = table.iter_by_depth().map(|p| p.pid()).collect();
        assert_eq!(order, [desktop, tty]);

        let bytes_before = table.framebuffer_bytes();
        assert!(table.kill(tty));
        assert_eq!(table.framebuffer_bytes(), bytes_before - 100 * 80 * 4);
        assert!(!table.kill(tty));
        assert!(table.lookup(tty).is_none());
        assert_eq!(table.len(), 1);
        assert!(table.kill(desktop));
        assert_eq!(table.framebuffer_bytes(), 0);

        // Ids are not reused
        assert_eq!(table.start(idle(), windowed(0)).unwrap(), 2);
    }

    #[test]
    fn test_fullscreen_takes_screen_size() {
        let mut table = table();
        let pid = table
            .start(idle(), ProcessInfo::new("bg", WindowKind::Fullscreen, Geometry::new(5, 5, 40, 40, -3)))
            .unwrap();
        let entity = table.lookup(pid).unwrap();
        assert_eq!(entity.bounds(), Rect::new(0, 0, 320, 200));
        assert_eq!(entity.geometry().depth, -3);
        assert_eq!(entity.framebuffer().width(), 320);
    }

    #[test]
    fn test_start_failures_leave_table_untouched() {
        let mut config = KernelConfig::with_screen(320, 200);
        config.max_processes = 2;
        config.framebuffer_budget = 100 * 80 * 4;
        let mut table = ProcessTable::new(&config);

        let zero = ProcessInfo::new("zero", WindowKind::Frameless, Geometry::new(0, 10, 0, 0, 0));
        assert_eq!(table.start(idle(), zero), Err(KernelError::InvalidGeometry));

        table.start(idle(), windowed(0)).unwrap();
        assert_eq!(table.start(idle(), windowed(1)), Err(KernelError::OutOfMemory));
        assert_eq!(table.len(), 1);
        assert_eq!(table.framebuffer_bytes(), 100 * 80 * 4);

        table.set_max_processes(1);
        assert_eq!(table.start(idle(), windowed(1)), Err(KernelError::TableFull));
        assert_eq!(table.next_pid, 1);
    }

    #[test]
    fn test_init_on_start_and_kill_on_destroy() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let mut table = table();
        let pid = table
            .start(
                boxed(move |msg, _| {
                    log.borrow_mut().push(msg.name());
                    Response::Success
                }),
                windowed(0),
            )
            .unwrap();
        table.deliver(pid, &Message::Tick);
        table.kill(pid);
        assert_eq!(*seen.borrow(), ["INIT", "TICK", "KILL"]);
    }

    #[test]
    fn test_kill_response_is_deferred() {
        let mut table = table();
        let pid = table.start(dies_on_tick(), windowed(0)).unwrap();
        assert_eq!(table.deliver(pid, &Message::Tick), Some(Response::Kill));
        assert!(table.lookup(pid).is_some());
        assert_eq!(table.deliver(pid, &Message::Tick), None);
        assert_eq!(table.reap(), 1);
        assert!(table.lookup(pid).is_none());
        assert_eq!(table.reap(), 0);
    }

    #[test]
    fn test_reaped_process_gets_no_second_kill() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let mut table = table();
        let pid = table
            .start(
                boxed(move |msg, _| {
                    log.borrow_mut().push(msg.name());
                    match msg {
                        Message::Tick => Response::Kill,
                        _ => Response::Success,
                    }
                }),
                windowed(0),
            )
            .unwrap();
        table.set_focus(pid);
        table.deliver(pid, &Message::Tick);
        assert_eq!(table.reap(), 1);
        assert_eq!(*seen.borrow(), ["INIT", "TICK"]);
        assert_eq!(table.framebuffer_bytes(), 0);
        assert_eq!(table.focused(), None);
    }

    #[test]
    fn test_doomed_window_is_transparent_to_clicks() {
        let mut table = table();
        let below = table.start(idle(), windowed(0)).unwrap();
        let above = table.start(dies_on_tick(), windowed(1)).unwrap();
        assert_eq!(table.hit_test(Point::new(20, 20)), Some(above));
        table.deliver(above, &Message::Tick);
        assert_eq!(table.hit_test(Point::new(20, 20)), Some(below));
    }

    #[test]
    fn test_next_window_depth_saturates() {
        let mut table = table();
        table.start(idle(), windowed(i64::MAX)).unwrap();
        assert_eq!(table.next_window_depth(), i64::MAX);
    }

    #[test]
    fn test_focus_never_dangles() {
        let mut table = table();
        let a = table.start(idle(), windowed(0)).unwrap();
        assert!(!table.set_focus(42));
        assert_eq!(table.focused(), None);
        assert!(table.set_focus(a));
        assert_eq!(table.focused(), Some(a));
        table.kill(a);
        assert_eq!(table.focused(), None);
    }

    #[test]
    fn test_depth_ties_break_by_id() {
        let mut table = table();
        let a = table.start(idle(), windowed(5)).unwrap();
        let b = table.start(idle(), windowed(5)).unwrap();
        let c = table.start(idle(), windowed(-2)).unwrap();
        let order: Vec<Pid> = table.iter_by_depth().map(|p| p.pid()).collect();
        assert_eq!(order, [c, a, b]);
        let top: Vec<Pid> = table.iter_by_depth().rev().map(|p| p.pid()).collect();
        assert_eq!(top, [b, a, c]);
        assert_eq!(table.iter_by_depth().len(), 3);
        assert_eq!(table.hit_test(Point::new(20, 20)), Some(b));
        assert_eq!(table.hit_test(Point::new(300, 190)), None);
        assert_eq!(table.next_window_depth(), 6);
    }

    #[test]
    fn test_clear_response_wipes_and_schedules_draw() {
        let mut table = table();
        let pid = table
            .start(
                boxed(|msg, ctx| match msg {
                    Message::Init => {
                        let area = ctx.client_area();
                        ctx.framebuffer().fill_rect(area, 0xFF00FF00);
                        Response::Draw
                    }
                    _ => Response::Clear,
                }),
                ProcessInfo::new("p", WindowKind::Frameless, Geometry::new(4, 4, 0, 0, 0)),
            )
            .unwrap();
        assert_eq!(table.lookup(pid).unwrap().framebuffer().get_pixel(1, 1), 0xFF00FF00);
        table.take_damage();

        table.deliver(pid, &Message::Clear);
        assert_eq!(table.lookup(pid).unwrap().framebuffer().get_pixel(1, 1), table.background());
        assert_eq!(table.take_redraws(), [pid]);
        assert!(table.take_redraws().is_empty());
        assert_eq!(table.take_damage(), [Rect::new(0, 0, 4, 4)]);
    }

    #[test]
    fn test_requests_carry_sender() {
        let mut table = table();
        let pid = table
            .start(
                boxed(|msg, ctx| {
                    if *msg == Message::Init {
                        ctx.request(KernelRequest::Command(String::from("help")));
                    }
                    Response::Success
                }),
                windowed(0),
            )
            .unwrap();
        assert_eq!(table.take_requests(), [(pid, KernelRequest::Command(String::from("help")))]);
        assert!(table.push_reply(pid, String::from("ok")));
        assert!(!table.push_reply(99, String::from("lost")));
        assert_eq!(table.take_redraws(), [pid]);
    }
}
