/// Window creation info and the window-system collaborator contract

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// Presentation mode for a window's back-buffer chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentMode {
    /// Present immediately, no vertical-blank wait (may tear)
    #[default]
    Immediate,
    /// Wait for the vertical blank
    Vsync,
}

/// Descriptor for creating a window
#[derive(Debug, Clone)]
pub struct WindowInfo {
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
    /// Presentation mode
    pub present_mode: PresentMode,
    /// Requested back-buffer count (clamped to a minimum of 1)
    pub framebuffer_count: u32,
}

impl WindowInfo {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            present_mode: PresentMode::default(),
            framebuffer_count: 0,
        }
    }
}

/// Keyboard and mouse-button keys the input passthrough understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Key {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Num0, Num1, Num2, Num3, Num4, Num5, Num6, Num7, Num8, Num9,
    Space, Escape, Enter, Tab, Backspace,
    Shift, Control, Alt,
    Up, Down, Left, Right,
    MouseLeft, MouseRight, MouseMiddle,
}

impl Key {
    /// Number of distinct keys
    pub const COUNT: usize = Key::MouseMiddle as usize + 1;
}

/// The window-system collaborator
///
/// Supplies the native drawable surface handles and window-system state the
/// backend passes through. The implementor guarantees the surface remains
/// valid until the corresponding `Window` handle is freed.
///
/// How the implementor tracks input is its own concern; [`InputTracker`] is a
/// ready-made event sink for the common case.
pub trait WindowSource: HasWindowHandle + HasDisplayHandle + Send + Sync {
    /// Current drawable size in pixels
    fn drawable_size(&self) -> (u32, u32);

    /// Set the window title
    fn set_title(&self, title: &str);

    /// Whether the user requested the window to close
    fn should_close(&self) -> bool;

    /// Whether the given key is currently held down
    fn key_down(&self, key: Key) -> bool;

    /// Current mouse position in window coordinates
    fn mouse_position(&self) -> (i32, i32);
}

/// Windowing-library-agnostic input state sink
///
/// The application's event handler feeds events in; `WindowSource`
/// implementations answer queries out of it. Wrap it in a mutex when the
/// event loop and the renderer live on different threads.
#[derive(Debug)]
pub struct InputTracker {
    keys: [bool; Key::COUNT],
    mouse_position: (i32, i32),
    close_requested: bool,
}

impl InputTracker {
    pub fn new() -> Self {
        Self {
            keys: [false; Key::COUNT],
            mouse_position: (0, 0),
            close_requested: false,
        }
    }

    /// Record a key press or release
    pub fn set_key(&mut self, key: Key, pressed: bool) {
        self.keys[key as usize] = pressed;
    }

    /// Record a mouse move
    pub fn set_mouse_position(&mut self, x: i32, y: i32) {
        self.mouse_position = (x, y);
    }

    /// Record a close request
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    /// Whether the given key is currently held down
    pub fn key_down(&self, key: Key) -> bool {
        self.keys[key as usize]
    }

    /// Last recorded mouse position
    pub fn mouse_position(&self) -> (i32, i32) {
        self.mouse_position
    }

    /// Whether a close was requested
    pub fn close_requested(&self) -> bool {
        self.close_requested
    }
}

impl Default for InputTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;
