//! Calculator
//!
//! Four-function calculator driven by mouse clicks on its buttons or by the
//! keyboard (`0-9 . + - * / = Enter Backspace Escape`).

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;

use crate::graphics::{Framebuffer, Point, Rect, COLOR_WHITE, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::message::{Message, Response, KEY_BACKSPACE, KEY_ENTER, KEY_ESCAPE};
use crate::process::{Geometry, Process, ProcessContext, ProcessInfo, ProcessTable, WindowKind};

const WIDTH: u32 = 220;
const HEIGHT: u32 = 280;
const GAP: u32 = 6;
const DISPLAY_HEIGHT: u32 = 36;
/// Longest number that can be typed in
const MAX_DIGITS: usize = 15;

const PANEL_COLOR: u32 = 0xFF282C34;
const DISPLAY_COLOR: u32 = 0xFF1E1E23;
const DIGIT_COLOR: u32 = 0xFF3E4451;
const OPERATOR_COLOR: u32 = 0xFF50505A;
const CLEAR_COLOR: u32 = 0xFF783C3C;
const EQUALS_COLOR: u32 = 0xFF3D7AB8;

pub(super) const TITLE: &str = "Calculator";

pub(super) fn create(table: &ProcessTable) -> (Box<dyn Process>, ProcessInfo) {
    let (left, top) = super::cascade(table);
    let depth = table.next_window_depth();
    (
        Box::new(Calculator::new()),
        ProcessInfo::new(TITLE, WindowKind::Windowed, Geometry::new(WIDTH, HEIGHT, left, top, depth)),
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CalcButton {
    Digit(u8),
    Add,
    Subtract,
    Multiply,
    Divide,
    Equals,
    Clear,
    Backspace,
    Decimal,
    Negate,
}

impl CalcButton {
    fn label(&self) -> &'static str {
        match self {
            CalcButton::Digit(d) => ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"][*d as usize % 10],
            CalcButton::Add => "+",
            CalcButton::Subtract => "-",
            CalcButton::Multiply => "x",
            CalcButton::Divide => "/",
            CalcButton::Equals => "=",
            CalcButton::Clear => "C",
            CalcButton::Backspace => "<",
            CalcButton::Decimal => ".",
            CalcButton::Negate => "+/-",
        }
    }

    fn color(&self) -> u32 {
        match self {
            CalcButton::Equals => EQUALS_COLOR,
            CalcButton::Add | CalcButton::Subtract | CalcButton::Multiply | CalcButton::Divide => {
                OPERATOR_COLOR
            }
            CalcButton::Clear => CLEAR_COLOR,
            _ => DIGIT_COLOR,
        }
    }

    fn from_key(key: u8) -> Option<CalcButton> {
        Some(match key {
            b'0'..=b'9' => CalcButton::Digit(key - b'0'),
            b'+' => CalcButton::Add,
            b'-' => CalcButton::Subtract,
            b'*' | b'x' => CalcButton::Multiply,
            b'/' => CalcButton::Divide,
            b'=' | KEY_ENTER => CalcButton::Equals,
            b'.' => CalcButton::Decimal,
            b'c' | KEY_ESCAPE => CalcButton::Clear,
            KEY_BACKSPACE => CalcButton::Backspace,
            _ => return None,
        })
    }
}

const LAYOUT: [[CalcButton; 4]; 5] = [
    [CalcButton::Clear, CalcButton::Negate, CalcButton::Backspace, CalcButton::Divide],
    [CalcButton::Digit(7), CalcButton::Digit(8), CalcButton::Digit(9), CalcButton::Multiply],
    [CalcButton::Digit(4), CalcButton::Digit(5), CalcButton::Digit(6), CalcButton::Subtract],
    [CalcButton::Digit(1), CalcButton::Digit(2), CalcButton::Digit(3), CalcButton::Add],
    [CalcButton::Digit(0), CalcButton::Decimal, CalcButton::Equals, CalcButton::Equals],
];

pub struct Calculator {
    display: String,
    current: f64,
    previous: f64,
    operator: Option<CalcButton>,
    /// Next digit starts a new number
    new_entry: bool,
    left_was_held: bool,
}

impl Calculator {
    pub fn new() -> Self {
        Self {
            display: String::from("0"),
            current: 0.0,
            previous: 0.0,
            operator: None,
            new_entry: true,
            left_was_held: false,
        }
    }

    fn press(&mut self, button: CalcButton) {
        match button {
            CalcButton::Digit(d) => {
                if self.new_entry || self.display == "0" {
                    self.display = format!("{}", d);
                    self.new_entry = false;
                } else if self.display.len() < MAX_DIGITS {
                    self.display.push((b'0' + d) as char);
                }
                self.current = self.display.parse().unwrap_or(0.0);
            }
            CalcButton::Decimal => {
                if self.new_entry {
                    self.display = String::from("0.");
                    self.new_entry = false;
                } else if !self.display.contains('.') {
                    self.display.push('.');
                }
            }
            CalcButton::Clear => *self = Self {
                left_was_held: self.left_was_held,
                ..Self::new()
            },
            CalcButton::Backspace => {
                if self.new_entry {
                    return;
                }
                self.display.pop();
                if self.display.is_empty() || self.display == "-" {
                    self.display = String::from("0");
                }
                self.current = self.display.parse().unwrap_or(0.0);
            }
            CalcButton::Negate => {
                if self.current != 0.0 {
                    self.current = -self.current;
                    self.display = match self.display.strip_prefix('-') {
                        Some(rest) => String::from(rest),
                        None => format!("-{}", self.display),
                    };
                }
            }
            CalcButton::Add | CalcButton::Subtract | CalcButton::Multiply | CalcButton::Divide => {
                if !self.new_entry {
                    self.execute_pending();
                }
                self.operator = Some(button);
                self.previous = self.current;
                self.new_entry = true;
            }
            CalcButton::Equals => {
                self.execute_pending();
                self.operator = None;
                self.new_entry = true;
            }
        }
    }

    fn execute_pending(&mut self) {
        let Some(op) = self.operator else { return };
        let result = match op {
            CalcButton::Add => self.previous + self.current,
            CalcButton::Subtract => self.previous - self.current,
            CalcButton::Multiply => self.previous * self.current,
            CalcButton::Divide if self.current == 0.0 => f64::NAN,
            CalcButton::Divide => self.previous / self.current,
            _ => self.current,
        };
        self.current = if result.is_nan() { 0.0 } else { result };
        self.display = format_number(result);
    }

    /// Screen rectangles of the buttons inside `area`
    fn buttons(area: Rect) -> impl Iterator<Item = (CalcButton, Rect)> {
        let top = area.y + (DISPLAY_HEIGHT + 2 * GAP) as i32;
        let w = area.w.saturating_sub(5 * GAP) / 4;
        let h = (area.h.saturating_sub(DISPLAY_HEIGHT + 2 * GAP)).saturating_sub(5 * GAP) / 5;
        LAYOUT.into_iter().enumerate().flat_map(move |(row, buttons)| {
            buttons.into_iter().enumerate().map(move |(col, button)| {
                let x = area.x + (GAP + col as u32 * (w + GAP)) as i32;
                let y = top + (row as u32 * (h + GAP)) as i32;
                (button, Rect::new(x, y, w, h))
            })
        })
    }

    fn button_at(area: Rect, position: Point) -> Option<CalcButton> {
        Self::buttons(area)
            .find(|(_, rect)| rect.contains(position))
            .map(|(button, _)| button)
    }

    fn paint(&self, fb: &mut Framebuffer, area: Rect) {
        fb.fill_rect(area, PANEL_COLOR);

        let display = Rect::new(area.x + GAP as i32, area.y + GAP as i32, area.w.saturating_sub(2 * GAP), DISPLAY_HEIGHT);
        fb.fill_rect(display, DISPLAY_COLOR);
        let text_w = (self.display.len() as u32 * GLYPH_WIDTH) as i32;
        let text_x = display.x + display.w as i32 - text_w - 8;
        let text_y = display.y + (DISPLAY_HEIGHT - GLYPH_HEIGHT) as i32 / 2;
        fb.draw_text(&self.display, Point::new(text_x, text_y), COLOR_WHITE);

        for (button, rect) in Self::buttons(area) {
            fb.fill_rect(rect, button.color());
            let label = button.label();
            let label_x = rect.x + (rect.w as i32 - (label.len() as u32 * GLYPH_WIDTH) as i32) / 2;
            let label_y = rect.y + (rect.h as i32 - GLYPH_HEIGHT as i32) / 2;
            fb.draw_text(label, Point::new(label_x, label_y), COLOR_WHITE);
        }
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        return String::from("Error");
    }
    if n.is_infinite() {
        return String::from("Infinity");
    }
    let magnitude = if n < 0.0 { -n } else { n };
    if n == (n as i64) as f64 && magnitude < 1e15 {
        format!("{}", n as i64)
    } else {
        let s = format!("{:.10}", n);
        String::from(s.trim_end_matches('0').trim_end_matches('.'))
    }
}

impl Process for Calculator {
    fn handle(&mut self, message: &Message, ctx: &mut ProcessContext<'_>) -> Response {
        let area = ctx.client_area();
        match message {
            Message::Init => {
                *self = Self::new();
                self.paint(ctx.framebuffer(), area);
                Response::Draw
            }
            Message::Draw => {
                self.paint(ctx.framebuffer(), area);
                Response::Draw
            }
            Message::Clear => Response::Clear,
            Message::Mouse(info) => {
                let pressed = info.left_held && !self.left_was_held;
                self.left_was_held = info.left_held;
                match Self::button_at(area, info.position).filter(|_| pressed) {
                    Some(button) => {
                        self.press(button);
                        self.paint(ctx.framebuffer(), area);
                        Response::Draw
                    }
                    None => Response::Success,
                }
            }
            Message::KeyPress(key) => match CalcButton::from_key(*key) {
                Some(button) => {
                    self.press(button);
                    self.paint(ctx.framebuffer(), area);
                    Response::Draw
                }
                None => Response::Success,
            },
            Message::Tick | Message::Kill => Response::Success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(keys: &str) -> Calculator {
        let mut calc = Calculator::new();
        for key in keys.bytes() {
            if let Some(button) = CalcButton::from_key(key) {
                calc.press(button);
            }
        }
        calc
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(run("12+30=").display, "42");
        assert_eq!(run("7-10=").display, "-3");
        assert_eq!(run("1.5*4=").display, "6");
        assert_eq!(run("1/4=").display, "0.25");
        // Chained operators evaluate left to right
        assert_eq!(run("2+3*4=").display, "20");
    }

    #[test]
    fn test_division_by_zero() {
        let calc = run("5/0=");
        assert_eq!(calc.display, "Error");
        assert_eq!(run("5/0=c").display, "0");
    }

    #[test]
    fn test_editing() {
        assert_eq!(run("123\x08").display, "12");
        assert_eq!(run("9\x08").display, "0");
        let mut calc = run("8");
        calc.press(CalcButton::Negate);
        assert_eq!(calc.display, "-8");
        calc.press(CalcButton::Negate);
        assert_eq!(calc.display, "8");
        assert_eq!(run("1..2").display, "1.2");
    }

    #[test]
    fn test_click_hits_button() {
        let area = Rect::new(0, 0, 218, 262);
        let (seven, rect) = Calculator::buttons(area).nth(4).unwrap();
        assert_eq!(seven, CalcButton::Digit(7));
        let center = Point::new(rect.x + rect.w as i32 / 2, rect.y + rect.h as i32 / 2);
        assert_eq!(Calculator::button_at(area, center), Some(CalcButton::Digit(7)));
        assert_eq!(Calculator::button_at(area, Point::new(2, 2)), None);
    }
}
