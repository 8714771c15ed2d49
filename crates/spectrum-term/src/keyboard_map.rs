//! Host keyboard to Spectrum matrix mapping.
//!
//! Maps crossterm key events to (row, bit) matrix positions. Most keys
//! map to a single position; editing keys map to the Spectrum's
//! shifted chords (Backspace = CAPS SHIFT + 0, cursors = CAPS SHIFT +
//! 5/6/7/8).

use crossterm::event::KeyCode;

/// Matrix position: (half-row 0-7, bit 0-4).
pub type Key = (usize, u8);

/// CAPS SHIFT position.
pub const CAPS_SHIFT: Key = (0, 0);
/// SYMBOL SHIFT position.
pub const SYM_SHIFT: Key = (6, 1);

/// Matrix position for a character (letters are case-insensitive).
#[must_use]
pub fn map_char(c: char) -> Option<Key> {
    let key = match c.to_ascii_lowercase() {
        'a' => (1, 0),
        'b' => (6, 4),
        'c' => (0, 3),
        'd' => (1, 2),
        'e' => (2, 2),
        'f' => (1, 3),
        'g' => (1, 4),
        'h' => (5, 4),
        'i' => (7, 2),
        'j' => (5, 3),
        'k' => (5, 2),
        'l' => (5, 1),
        'm' => (6, 2),
        'n' => (6, 3),
        'o' => (7, 1),
        'p' => (7, 0),
        'q' => (2, 0),
        'r' => (2, 3),
        's' => (1, 1),
        't' => (2, 4),
        'u' => (7, 3),
        'v' => (0, 4),
        'w' => (2, 1),
        'x' => (0, 2),
        'y' => (7, 4),
        'z' => (0, 1),
        '1' => (3, 0),
        '2' => (3, 1),
        '3' => (3, 2),
        '4' => (3, 3),
        '5' => (3, 4),
        '6' => (4, 4),
        '7' => (4, 3),
        '8' => (4, 2),
        '9' => (4, 1),
        '0' => (4, 0),
        ' ' => (6, 0),
        _ => return None,
    };
    Some(key)
}

/// Keys to press together for a host key event. Returns up to two matrix
/// positions (chords use CAPS SHIFT).
#[must_use]
pub fn map_keycode(code: KeyCode) -> Option<(Key, Option<Key>)> {
    match code {
        KeyCode::Char(c) => {
            let key = map_char(c)?;
            // An uppercase letter arrives as its own character; press the
            // Spectrum's CAPS SHIFT with it.
            let shifted = c.is_ascii_uppercase();
            Some((key, shifted.then_some(CAPS_SHIFT)))
        }
        KeyCode::Enter => Some(((5, 0), None)),
        // DELETE on the Spectrum is CAPS SHIFT + 0.
        KeyCode::Backspace => Some(((4, 0), Some(CAPS_SHIFT))),
        // Cursor keys are CAPS SHIFT + 5/6/7/8.
        KeyCode::Left => Some(((3, 4), Some(CAPS_SHIFT))),
        KeyCode::Down => Some(((4, 4), Some(CAPS_SHIFT))),
        KeyCode::Up => Some(((4, 3), Some(CAPS_SHIFT))),
        KeyCode::Right => Some(((4, 2), Some(CAPS_SHIFT))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_map_to_spec_rows() {
        assert_eq!(map_char('z'), Some((0, 1)));
        assert_eq!(map_char('a'), Some((1, 0)));
        assert_eq!(map_char('q'), Some((2, 0)));
        assert_eq!(map_char('p'), Some((7, 0)));
        assert_eq!(map_char('h'), Some((5, 4)));
        assert_eq!(map_char('b'), Some((6, 4)));
    }

    #[test]
    fn digits_split_across_two_rows() {
        assert_eq!(map_char('1'), Some((3, 0)));
        assert_eq!(map_char('5'), Some((3, 4)));
        assert_eq!(map_char('6'), Some((4, 4)));
        assert_eq!(map_char('0'), Some((4, 0)));
    }

    #[test]
    fn backspace_is_caps_zero() {
        assert_eq!(map_keycode(KeyCode::Backspace), Some(((4, 0), Some(CAPS_SHIFT))));
    }

    #[test]
    fn uppercase_adds_caps_shift() {
        assert_eq!(map_keycode(KeyCode::Char('A')), Some(((1, 0), Some(CAPS_SHIFT))));
        assert_eq!(map_keycode(KeyCode::Char('a')), Some(((1, 0), None)));
    }

    #[test]
    fn unmapped_keys_are_none() {
        assert_eq!(map_keycode(KeyCode::F(1)), None);
        assert_eq!(map_char('!'), None);
    }
}
