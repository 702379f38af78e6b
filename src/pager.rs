//! Windowed cursor over search results
//!
//! The pager never wraps and never errors: stepping past either end keeps
//! returning the boundary window.

#[cfg(test)]
mod proptests;

use std::sync::Arc;

/// Default number of items per window
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Fixed-size window cursor over an immutable sequence.
///
/// Items are shared behind an `Arc` so that cloning a session that owns a
/// pager does not copy the result list.
#[derive(Debug, Clone)]
pub struct ResultPager<T> {
    items: Arc<[T]>,
    window: usize,
    cursor: isize,
}

impl<T> ResultPager<T> {
    /// Create a pager positioned before the first window.
    ///
    /// A window size of zero is bumped to one.
    pub fn new(items: Vec<T>, window: usize) -> Self {
        let window = window.max(1);
        Self {
            items: Arc::from(items),
            window,
            cursor: -to_isize(window),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window
    }

    /// Current cursor offset; starts at `-window_size`
    #[cfg(test)]
    pub fn cursor(&self) -> isize {
        self.cursor
    }

    /// All items, in order
    #[cfg(test)]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Advance by one window.
    ///
    /// When the tail from the current cursor already fits in a window the
    /// cursor stays put and the tail is returned again.
    #[allow(clippy::should_implement_trait)] // not an iterator: idempotent at the end
    pub fn next(&mut self) -> &[T] {
        let len = to_isize(self.items.len());
        let step = to_isize(self.window);
        if len - self.cursor > step {
            self.cursor += step;
            self.slice(self.cursor, self.cursor + step)
        } else {
            self.slice(self.cursor, len)
        }
    }

    /// Step back by one window.
    ///
    /// Returns the window preceding the cursor, then moves the cursor back,
    /// clamping at zero. At or before the start it returns the first window.
    pub fn prev(&mut self) -> &[T] {
        let step = to_isize(self.window);
        if self.cursor > 0 {
            let end = self.cursor;
            self.cursor = (self.cursor - step).max(0);
            self.slice(end - step, end)
        } else {
            self.cursor = 0;
            self.slice(0, step)
        }
    }

    /// The window at the cursor (clamped to zero), without moving it
    pub fn current(&self) -> &[T] {
        let start = self.cursor.max(0);
        self.slice(start, start + to_isize(self.window))
    }

    /// Resolve a zero-based position in the current window
    pub fn get_in_window(&self, index: usize) -> Option<&T> {
        self.current().get(index)
    }

    fn slice(&self, start: isize, end: isize) -> &[T] {
        let len = self.items.len();
        let start = clamp_index(start, len);
        let end = clamp_index(end, len).max(start);
        &self.items[start..end]
    }
}

#[allow(clippy::cast_possible_wrap)] // result lists are far below isize::MAX
fn to_isize(n: usize) -> isize {
    n as isize
}

fn clamp_index(i: isize, len: usize) -> usize {
    usize::try_from(i).map_or(0, |i| i.min(len))
}
