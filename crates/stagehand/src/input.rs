pub mod keysym {
    pub const BACKSPACE: u32 = 0xff08;
    pub const RETURN: u32 = 0xff0d;
    pub const ESCAPE: u32 = 0xff1b;
    pub const LEFT: u32 = 0xff51;
    pub const UP: u32 = 0xff52;
    pub const RIGHT: u32 = 0xff53;
    pub const DOWN: u32 = 0xff54;
    pub const PAGE_UP: u32 = 0xff55;
    pub const PAGE_DOWN: u32 = 0xff56;
    pub const KP_ENTER: u32 = 0xff8d;
    pub const F11: u32 = 0xffc8;
    pub const SPACE: u32 = 0x0020;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Advance,
    Retreat,
    Activate,
    ToggleFullscreen,
    Quit,
}

impl Command {
    pub fn from_keysym(code: u32) -> Option<Self> {
        use keysym::*;
        match code {
            LEFT | UP | BACKSPACE | PAGE_UP => Some(Self::Retreat),
            RIGHT | SPACE | PAGE_DOWN => Some(Self::Advance),
            ESCAPE => Some(Self::Quit),
            F11 => Some(Self::ToggleFullscreen),
            RETURN | KP_ENTER => Some(Self::Activate),
            _ => None,
        }
    }
}

/// A key transition as delivered by the host or a remote surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Press(u32),
    Release(u32),
}

impl KeyEvent {
    /// Only presses drive navigation.
    pub fn command(self) -> Option<Command> {
        match self {
            Self::Press(code) => Command::from_keysym(code),
            Self::Release(_) => None,
        }
    }
}
