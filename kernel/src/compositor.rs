//! Compositor
//!
//! Rebuilds the damaged parts of the back buffer with the painter's
//! algorithm: background first, then every process framebuffer in ascending
//! depth, then the mouse cursor. `present` copies exactly those parts to the
//! display, so a frame is never shown half drawn.

use alloc::vec::Vec;

use crate::config::KernelConfig;
use crate::error::KernelError;
use crate::graphics::{Display, Framebuffer, Point, Rect, COLOR_BLACK, COLOR_WHITE};
use crate::process::ProcessTable;

/// Damage rectangles tracked before falling back to a full redraw
pub const MAX_DIRTY_RECTS: usize = 32;

/// Arrow cursor, 'X' outline and '.' fill
const CURSOR: [&str; 16] = [
    "X          ",
    "XX         ",
    "X.X        ",
    "X..X       ",
    "X...X      ",
    "X....X     ",
    "X.....X    ",
    "X......X   ",
    "X.......X  ",
    "X........X ",
    "X.....XXXXX",
    "X..X..X    ",
    "X.X X..X   ",
    "XX  X..X   ",
    "X    X..X  ",
    "     XXXX  ",
];
const CURSOR_WIDTH: u32 = 11;
const CURSOR_HEIGHT: u32 = CURSOR.len() as u32;

/// Pending screen damage. Overlapping rectangles are merged; past
/// `MAX_DIRTY_RECTS` the whole screen is redrawn.
struct DamageList {
    rects: Vec<Rect>,
    full_redraw: bool,
}

impl DamageList {
    fn new() -> Self {
        DamageList {
            rects: Vec::new(),
            // First frame paints everything
            full_redraw: true,
        }
    }

    fn add(&mut self, rect: Rect) {
        if self.full_redraw || rect.is_empty() {
            return;
        }

        if let Some(existing) = self.rects.iter_mut().find(|r| r.overlaps(&rect)) {
            *existing = existing.union(&rect);
            return;
        }

        if self.rects.len() < MAX_DIRTY_RECTS {
            self.rects.push(rect);
        } else {
            self.mark_full_redraw();
        }
    }

    fn mark_full_redraw(&mut self) {
        self.full_redraw = true;
        self.rects.clear();
    }

    fn is_empty(&self) -> bool {
        !self.full_redraw && self.rects.is_empty()
    }

    fn take(&mut self, screen: Rect) -> Vec<Rect> {
        if core::mem::take(&mut self.full_redraw) {
            self.rects.clear();
            return alloc::vec![screen];
        }
        core::mem::take(&mut self.rects)
    }
}

pub struct Compositor<D: Display> {
    display: D,
    back: Framebuffer,
    damage: DamageList,
    /// Regions composited but not yet presented
    pending: Vec<Rect>,
    background: u32,
    cursor: Point,
    draw_cursor: bool,
    frames: u64,
}

impl<D: Display> Compositor<D> {
    /// Allocate a back buffer the size of `display`
    pub fn new(display: D, config: &KernelConfig) -> Result<Self, KernelError> {
        let (width, height) = display.size();
        let back = Framebuffer::try_new(width, height, config.background)?;
        crate::log_debug!("[COMPOSITOR] Back buffer {}x{} ({} KB)", width, height, back.size_bytes() / 1024);
        Ok(Compositor {
            display,
            back,
            damage: DamageList::new(),
            pending: Vec::new(),
            background: config.background,
            cursor: Point::new(width as i32 / 2, height as i32 / 2),
            draw_cursor: config.draw_mouse,
            frames: 0,
        })
    }

    pub fn screen(&self) -> Rect {
        self.back.bounds()
    }

    /// Mark a screen region for recomposition
    pub fn invalidate(&mut self, rect: Rect) {
        if let Some(area) = rect.intersect(&self.screen()) {
            self.damage.add(area);
        }
    }

    pub fn invalidate_all(&mut self) {
        self.damage.mark_full_redraw();
    }

    pub fn needs_composite(&self) -> bool {
        !self.damage.is_empty()
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn set_cursor(&mut self, position: Point) {
        if position == self.cursor {
            return;
        }
        if self.draw_cursor {
            self.invalidate(self.cursor_rect());
        }
        self.cursor = position;
        if self.draw_cursor {
            self.invalidate(self.cursor_rect());
        }
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        if visible != self.draw_cursor {
            self.draw_cursor = visible;
            self.invalidate(self.cursor_rect());
        }
    }

    pub fn set_background(&mut self, color: u32) {
        if color != self.background {
            self.background = color;
            self.invalidate_all();
        }
    }

    fn cursor_rect(&self) -> Rect {
        Rect::new(self.cursor.x, self.cursor.y, CURSOR_WIDTH, CURSOR_HEIGHT)
    }

    /// Repaint every damaged region of the back buffer from `table`.
    /// Returns how many regions were rebuilt.
    pub fn composite(&mut self, table: &ProcessTable) -> usize {
        let screen = self.screen();
        let regions = self.damage.take(screen);

        for region in &regions {
            self.back.fill_rect(*region, self.background);
            for process in table.iter_by_depth() {
                let geometry = process.geometry();
                if let Some(area) = process.bounds().intersect(region) {
                    self.back
                        .blit(process.framebuffer(), Point::new(geometry.left, geometry.top), area);
                }
            }
            if self.draw_cursor {
                self.paint_cursor(*region);
            }
        }

        let count = regions.len();
        self.pending.extend(regions);
        count
    }

    fn paint_cursor(&mut self, clip: Rect) {
        for (dy, row) in CURSOR.iter().enumerate() {
            for (dx, cell) in row.bytes().enumerate() {
                let color = match cell {
                    b'X' => COLOR_BLACK,
                    b'.' => COLOR_WHITE,
                    _ => continue,
                };
                let p = Point::new(self.cursor.x + dx as i32, self.cursor.y + dy as i32);
                if clip.contains(p) {
                    self.back.set_pixel(p.x, p.y, color);
                }
            }
        }
    }

    /// Copy composited regions to the display
    pub fn present(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        for region in self.pending.drain(..) {
            self.display.present(&self.back, region);
        }
        self.frames += 1;
    }

    /// Frames presented so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn display(&self) -> &D {
        &self.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, Response};
    use crate::process::{Geometry, Process, ProcessContext, ProcessInfo, WindowKind};
    use alloc::boxed::Box;

    const BG: u32 = 0xFF101010;

    fn config() -> KernelConfig {
        let mut config = KernelConfig::with_screen(64, 48);
        config.background = BG;
        config.draw_mouse = false;
        config
    }

    /// Frameless process that paints itself one solid color
    fn solid(color: u32) -> Box<dyn Process> {
        fn paint(color: u32) -> impl FnMut(&Message, &mut ProcessContext<'_>) -> Response {
            move |msg, ctx| match msg {
                Message::Init | Message::Draw => {
                    ctx.framebuffer().fill(color);
                    Response::Draw
                }
                _ => Response::Success,
            }
        }
        Box::new(paint(color))
    }

    fn frameless(w: u32, h: u32, left: i32, top: i32, depth: i64) -> ProcessInfo {
        ProcessInfo::new("solid", WindowKind::Frameless, Geometry::new(w, h, left, top, depth))
    }

    fn setup() -> (ProcessTable, Compositor<Framebuffer>) {
        let config = config();
        let display = Framebuffer::try_new(64, 48, 0).unwrap();
        (ProcessTable::new(&config), Compositor::new(display, &config).unwrap())
    }

    #[test]
    fn test_higher_depth_wins_overlap() {
        let (mut table, mut compositor) = setup();
        table.start(solid(0xFFAA0000), frameless(20, 20, 0, 0, 0)).unwrap();
        table.start(solid(0xFF00AA00), frameless(20, 20, 10, 10, 1)).unwrap();
        // Lower depth started last still ends up underneath
        table.start(solid(0xFF0000AA), frameless(20, 20, 5, 5, -1)).unwrap();

        compositor.composite(&table);
        compositor.present();
        let out = compositor.display();
        assert_eq!(out.get_pixel(1, 1), 0xFFAA0000);
        assert_eq!(out.get_pixel(15, 15), 0xFF00AA00);
        assert_eq!(out.get_pixel(6, 22), 0xFF0000AA);
        assert_eq!(out.get_pixel(60, 40), BG);
        assert_eq!(compositor.frames(), 1);
    }

    #[test]
    fn test_offscreen_parts_are_clipped() {
        let (mut table, mut compositor) = setup();
        table.start(solid(0xFFAA0000), frameless(30, 30, -10, 40, 0)).unwrap();
        table.start(solid(0xFF00AA00), frameless(10, 10, 100, 100, 0)).unwrap();
        compositor.composite(&table);
        compositor.present();
        let out = compositor.display();
        assert_eq!(out.get_pixel(0, 47), 0xFFAA0000);
        assert_eq!(out.get_pixel(19, 40), 0xFFAA0000);
        assert_eq!(out.get_pixel(20, 40), BG);
    }

    #[test]
    fn test_composite_is_idempotent() {
        let (mut table, mut compositor) = setup();
        table.start(solid(0xFFAA0000), frameless(20, 20, 4, 4, 0)).unwrap();
        compositor.composite(&table);
        compositor.present();
        let first = compositor.display().clone();

        assert!(!compositor.needs_composite());
        assert_eq!(compositor.composite(&table), 0);
        compositor.invalidate_all();
        compositor.composite(&table);
        compositor.present();
        assert!(*compositor.display() == first);
    }

    #[test]
    fn test_damage_limits_repaint() {
        let (mut table, mut compositor) = setup();
        compositor.composite(&table);
        compositor.present();

        // Added without invalidation: not visible yet
        table.start(solid(0xFFAA0000), frameless(8, 8, 0, 0, 0)).unwrap();
        table.start(solid(0xFF00AA00), frameless(8, 8, 40, 30, 0)).unwrap();
        compositor.invalidate(Rect::new(40, 30, 8, 8));
        assert_eq!(compositor.composite(&table), 1);
        compositor.present();
        assert_eq!(compositor.display().get_pixel(2, 2), BG);
        assert_eq!(compositor.display().get_pixel(42, 32), 0xFF00AA00);
    }

    #[test]
    fn test_damage_list_overflow_forces_full_redraw() {
        let mut list = DamageList::new();
        let screen = Rect::new(0, 0, 1000, 10);
        list.take(screen);
        for i in 0..MAX_DIRTY_RECTS as i32 + 1 {
            list.add(Rect::new(i * 10, 0, 5, 5));
        }
        assert_eq!(list.take(screen), [screen]);

        list.add(Rect::new(0, 0, 5, 5));
        list.add(Rect::new(3, 3, 5, 5));
        assert_eq!(list.take(screen), [Rect::new(0, 0, 8, 8)]);
        assert!(list.is_empty());
    }

    #[test]
    fn test_cursor_drawn_on_top_and_erased() {
        let mut config = config();
        config.draw_mouse = true;
        let table = ProcessTable::new(&config);
        let display = Framebuffer::try_new(64, 48, 0).unwrap();
        let mut compositor = Compositor::new(display, &config).unwrap();
        compositor.set_cursor(Point::new(10, 10));
        compositor.composite(&table);
        compositor.present();
        assert_eq!(compositor.display().get_pixel(10, 10), COLOR_BLACK);
        assert_eq!(compositor.display().get_pixel(11, 12), COLOR_WHITE);

        compositor.set_cursor(Point::new(30, 30));
        compositor.composite(&table);
        compositor.present();
        assert_eq!(compositor.display().get_pixel(10, 10), BG);
        assert_eq!(compositor.display().get_pixel(30, 30), COLOR_BLACK);
    }
}
