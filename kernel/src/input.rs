//! Input routing
//!
//! Turns raw device state into process messages: every tick goes to every
//! process, mouse state goes to the topmost window under the cursor, and key
//! presses go to the focused process. A mouse button transition inside a
//! window moves the focus there.

use crate::message::{KeyCode, Message, MouseInfo};
use crate::process::{Pid, ProcessTable};
use crate::graphics::Point;

/// Routes device input to processes. Remembers the previous mouse snapshot
/// to detect motion and button transitions.
#[derive(Debug, Default)]
pub struct InputRouter {
    last_mouse: Option<MouseInfo>,
}

impl InputRouter {
    pub const fn new() -> Self {
        Self { last_mouse: None }
    }

    /// Deliver `Tick` to every live process. Returns the number of deliveries.
    pub fn route_tick(&mut self, table: &mut ProcessTable) -> usize {
        // Snapshot: responses may change the table
        table
            .pids()
            .into_iter()
            .filter(|&pid| table.deliver(pid, &Message::Tick).is_some())
            .count()
    }

    /// Deliver a mouse snapshot in screen coordinates to the topmost window
    /// under the cursor. Unchanged snapshots are dropped. Returns the target.
    pub fn route_mouse(&mut self, table: &mut ProcessTable, state: MouseInfo) -> Option<Pid> {
        let previous = self.last_mouse.replace(state);
        if previous == Some(state) {
            return None;
        }

        let target = table.hit_test(state.position)?;
        let origin = table.lookup(target).map(|p| p.bounds())?;
        let local = MouseInfo {
            position: Point::new(state.position.x - origin.x, state.position.y - origin.y),
            ..state
        };
        table.deliver(target, &Message::Mouse(local))?;

        if buttons_changed(&previous.unwrap_or_default(), &state) {
            table.set_focus(target);
        }
        Some(target)
    }

    /// Deliver a key press to the focused process; dropped if nothing has focus
    pub fn route_key(&mut self, table: &mut ProcessTable, key: KeyCode) -> Option<Pid> {
        let Some(target) = table.focused() else {
            crate::log_trace!("[INPUT] Key {:#04x} dropped: no focus", key);
            return None;
        };
        table.deliver(target, &Message::KeyPress(key))?;
        Some(target)
    }

    /// Last mouse snapshot seen, in screen coordinates
    pub fn last_mouse(&self) -> Option<MouseInfo> {
        self.last_mouse
    }
}

fn buttons_changed(a: &MouseInfo, b: &MouseInfo) -> bool {
    a.left_held != b.left_held || a.middle_held != b.middle_held || a.right_held != b.right_held
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::message::Response;
    use crate::process::{Geometry, Process, ProcessContext, ProcessInfo, WindowKind};
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    type Log = Rc<RefCell<Vec<(Pid, Message)>>>;

    fn recorder(log: &Log) -> Box<dyn Process> {
        fn record(log: Log) -> impl FnMut(&Message, &mut ProcessContext<'_>) -> Response {
            move |msg, ctx| {
                if *msg != Message::Init {
                    log.borrow_mut().push((ctx.pid(), *msg));
                }
                Response::Success
            }
        }
        Box::new(record(log.clone()))
    }

    fn window(left: i32, top: i32, depth: i64) -> ProcessInfo {
        ProcessInfo::new("w", WindowKind::Frameless, Geometry::new(50, 50, left, top, depth))
    }

    fn mouse(x: i32, y: i32, left_held: bool) -> MouseInfo {
        MouseInfo {
            position: Point::new(x, y),
            left_held,
            ..MouseInfo::default()
        }
    }

    fn setup() -> (ProcessTable, Log, Pid, Pid) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut table = ProcessTable::new(&KernelConfig::with_screen(200, 200));
        let low = table.start(recorder(&log), window(0, 0, 0)).unwrap();
        let high = table.start(recorder(&log), window(25, 25, 3)).unwrap();
        (table, log, low, high)
    }

    #[test]
    fn test_tick_reaches_everyone() {
        let (mut table, log, low, high) = setup();
        let mut router = InputRouter::new();
        assert_eq!(router.route_tick(&mut table), 2);
        let mut got: Vec<Pid> = log.borrow().iter().map(|(pid, _)| *pid).collect();
        got.sort();
        assert_eq!(got, [low, high]);
    }

    #[test]
    fn test_mouse_hits_topmost_with_local_position() {
        let (mut table, log, _low, high) = setup();
        let mut router = InputRouter::new();
        assert_eq!(router.route_mouse(&mut table, mouse(30, 40, false)), Some(high));
        assert_eq!(
            log.borrow().last(),
            Some(&(high, Message::Mouse(mouse(5, 15, false))))
        );
    }

    #[test]
    fn test_focus_follows_button_transitions_only() {
        let (mut table, log, low, high) = setup();
        let mut router = InputRouter::new();

        router.route_mouse(&mut table, mouse(5, 5, false));
        assert_eq!(table.focused(), None);

        router.route_mouse(&mut table, mouse(5, 5, true));
        assert_eq!(table.focused(), Some(low));

        // Motion without a button change keeps focus
        router.route_mouse(&mut table, mouse(40, 40, true));
        assert_eq!(table.focused(), Some(low));

        // Release over the upper window
        router.route_mouse(&mut table, mouse(41, 40, false));
        assert_eq!(table.focused(), Some(high));

        // Outside every window: nothing delivered, focus unchanged
        let before = log.borrow().len();
        assert_eq!(router.route_mouse(&mut table, mouse(150, 150, false)), None);
        assert_eq!(log.borrow().len(), before);
        assert_eq!(table.focused(), Some(high));
    }

    #[test]
    fn test_repeated_snapshot_is_dropped() {
        let (mut table, log, _, _) = setup();
        let mut router = InputRouter::new();
        router.route_mouse(&mut table, mouse(5, 5, false));
        assert_eq!(router.route_mouse(&mut table, mouse(5, 5, false)), None);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_keys_go_to_focus_or_nowhere() {
        let (mut table, log, low, _) = setup();
        let mut router = InputRouter::new();
        assert_eq!(router.route_key(&mut table, b'a'), None);
        assert!(log.borrow().is_empty());

        table.set_focus(low);
        assert_eq!(router.route_key(&mut table, b'a'), Some(low));
        assert_eq!(log.borrow().last(), Some(&(low, Message::KeyPress(b'a'))));

        table.kill(low);
        assert_eq!(router.route_key(&mut table, b'b'), None);
    }
}
