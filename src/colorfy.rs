// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use bitflags::bitflags;

bitflags! {
  /// ANSI background, foreground and attribute settings.
  ///
  /// Flags combine with bitwise OR, e.g. `Color::BG_CYAN | Color::RED | Color::BOLD`.
  /// Escape codes are emitted in ascending bit order: backgrounds first,
  /// then foregrounds, then attributes.
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
  pub struct Color: u64 {
    const BG_DEFAULT   = 1 << 0;
    const BG_BLACK     = 1 << 1;
    const BG_RED       = 1 << 2;
    const BG_GREEN     = 1 << 3;
    const BG_YELLOW    = 1 << 4;
    const BG_BLUE      = 1 << 5;
    const BG_MAGENTA   = 1 << 6;
    const BG_CYAN      = 1 << 7;
    const BG_LTGRAY    = 1 << 8;
    const BG_DKGRAY    = 1 << 9;
    const BG_LTRED     = 1 << 10;
    const BG_LTGREEN   = 1 << 11;
    const BG_LTYELLOW  = 1 << 12;
    const BG_LTBLUE    = 1 << 13;
    const BG_LTMAGENTA = 1 << 14;
    const BG_LTCYAN    = 1 << 15;
    const BG_WHITE     = 1 << 16;

    const DEFAULT      = 1 << 17;
    const BLACK        = 1 << 18;
    const RED          = 1 << 19;
    const GREEN        = 1 << 20;
    const YELLOW       = 1 << 21;
    const BLUE         = 1 << 22;
    const MAGENTA      = 1 << 23;
    const CYAN         = 1 << 24;
    const LTGRAY       = 1 << 25;
    const DKGRAY       = 1 << 26;
    const LTRED        = 1 << 27;
    const LTGREEN      = 1 << 28;
    const LTYELLOW     = 1 << 29;
    const LTBLUE       = 1 << 30;
    const LTMAGENTA    = 1 << 31;
    const LTCYAN       = 1 << 32;
    const WHITE        = 1 << 33;

    const BOLD         = 1 << 34;
    /// Mileage varies on different terminals.
    const DIM          = 1 << 35;
    const UNDERLINE    = 1 << 36;
    const BLINK        = 1 << 37;
    const REVERSE      = 1 << 38;
    const HIDDEN       = 1 << 39;

    /// Command strings.
    const COLOR_COMMAND = Self::BOLD.bits() | Self::DKGRAY.bits();
    /// Command stdout.
    const COLOR_STDOUT  = Self::BOLD.bits() | Self::BG_LTGRAY.bits() | Self::BLACK.bits();
    /// Command stderr.
    const COLOR_STDERR  = Self::BOLD.bits() | Self::RED.bits();
    /// Command return code.
    const COLOR_RCODE   = Self::BOLD.bits() | Self::BLUE.bits();
  }
}

/// SGR code for each flag, indexed by bit position.
const ANSI_CODES: [u8; 40] = [
  // backgrounds
  49, 40, 41, 42, 43, 44, 45, 46, 47, 100, 101, 102, 103, 104, 105, 106, 107,
  // foregrounds
  39, 30, 31, 32, 33, 34, 35, 36, 37, 90, 91, 92, 93, 94, 95, 96, 97,
  // attributes
  1, 2, 4, 5, 7, 8,
];

/// The `;`-joined SGR parameter list for a color value.
pub fn ansi_codes(color: Color) -> String {
  ANSI_CODES
    .iter()
    .enumerate()
    .filter(|(bit, _)| color.bits() & (1u64 << bit) != 0)
    .map(|(_, code)| code.to_string())
    .collect::<Vec<_>>()
    .join(";")
}

/// Wraps `message` in ANSI escape sequences for `color`.
///
/// When `enabled` is false the message is returned unchanged, which is how
/// the `log_color` setting turns coloring off for log files and pipes.
///
/// ```
/// use glusto::colorfy::Color;
/// use glusto::colorfy::colorfy;
///
/// let text = colorfy(Color::BG_YELLOW | Color::RED | Color::BOLD, "this is a test", true);
/// assert_eq!(text, "\x1b[43;31;1mthis is a test\x1b[0m");
/// ```
pub fn colorfy(color: Color, message: &str, enabled: bool) -> String {
  if !enabled {
    return message.to_string();
  }
  format!("\x1b[{}m{}\x1b[0m", ansi_codes(color), message)
}
