//! # Line Composer
//!
//! Builds the single physical line produced by a `<line>` element: a left
//! run and a right run, each with its own column budget.
//!
//! ```text
//! |<- indent ->|<---- left budget ---->|<----- right budget ----->|
//!              Total.........................................9.99
//! ```
//!
//! The width left after indentation is split by `line-ratio`. Text that
//! overflows a run is cut at the run's budget; the gap between the runs is
//! filled with spaces so the right run ends at the line width.

/// Accumulates one composed line.
#[derive(Debug, Clone)]
pub struct LineComposer {
    indent: usize,
    width: usize,
    left_width: usize,
    right_width: usize,
    left: String,
    right: String,
    left_len: usize,
    right_len: usize,
    on_right: bool,
}

impl LineComposer {
    /// `width` is the full line width in columns; `indent` is counted in
    /// tab stops of `tabwidth` columns.
    pub fn new(indent: usize, tabwidth: usize, width: usize, ratio: f64) -> Self {
        let indent = indent.saturating_mul(tabwidth);
        let width = width.saturating_sub(indent);
        let left_width = (width as f64 * ratio.clamp(0.0, 1.0)) as usize;
        Self {
            indent,
            width,
            left_width,
            right_width: width - left_width,
            left: String::new(),
            right: String::new(),
            left_len: 0,
            right_len: 0,
            on_right: false,
        }
    }

    /// Route following text to the right run.
    pub fn start_right(&mut self) {
        self.on_right = true;
    }

    /// Whether the active run already holds text.
    pub fn has_content(&self) -> bool {
        if self.on_right {
            self.right_len > 0
        } else {
            self.left_len > 0
        }
    }

    /// Append to the active run, truncating at its budget.
    pub fn push(&mut self, text: &str) {
        let (buf, len, budget) = if self.on_right {
            (&mut self.right, &mut self.right_len, self.right_width)
        } else {
            (&mut self.left, &mut self.left_len, self.left_width)
        };
        let room = budget.saturating_sub(*len);
        for ch in text.chars().take(room) {
            buf.push(ch);
            *len += 1;
        }
    }

    /// The composed line, without a trailing newline.
    pub fn finish(&self) -> String {
        let gap = self.width - self.left_len - self.right_len;
        let mut line = String::with_capacity(self.indent + self.width);
        line.extend(std::iter::repeat_n(' ', self.indent));
        line.push_str(&self.left);
        line.extend(std::iter::repeat_n(' ', gap));
        line.push_str(&self.right);
        line
    }
}
