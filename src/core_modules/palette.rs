// THEORY:
// The canvas speaks in 4-bit colour ids, not RGB. The palette is the single
// fixed translation table between the two worlds: 16 entries, id 0..15, each
// an opaque RGB triple. The engine never validates ids beyond the 4-bit
// invariant; lookups mask to the low nibble so the table itself is total.
// `nearest_colour` goes the other way and is only needed at the edge of the
// system, when an arbitrary source image is quantized into canvas colours for
// the demo runner. Closeness is plain Manhattan distance over the three
// channels, which is what the upstream canvas tooling uses.

/// Number of colours on the canvas. Ids are 4-bit values.
pub const PALETTE_SIZE: usize = 16;

/// One palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

const fn rgb_entry(red: u8, green: u8, blue: u8) -> Rgb {
    Rgb { red, green, blue }
}

/// The fixed 16-entry canvas palette, indexed by colour id.
pub const PALETTE: [Rgb; PALETTE_SIZE] = [
    rgb_entry(255, 255, 255), // 0: white
    rgb_entry(228, 228, 228), // 1: light grey
    rgb_entry(136, 136, 136), // 2: grey
    rgb_entry(34, 34, 34),    // 3: black
    rgb_entry(255, 167, 209), // 4: pink
    rgb_entry(229, 0, 0),     // 5: red
    rgb_entry(229, 149, 0),   // 6: orange
    rgb_entry(160, 106, 66),  // 7: brown
    rgb_entry(229, 217, 0),   // 8: yellow
    rgb_entry(148, 224, 68),  // 9: lime
    rgb_entry(2, 190, 1),     // 10: green
    rgb_entry(0, 211, 221),   // 11: cyan
    rgb_entry(0, 131, 199),   // 12: blue
    rgb_entry(0, 0, 234),     // 13: dark blue
    rgb_entry(207, 110, 228), // 14: purple
    rgb_entry(130, 0, 128),   // 15: magenta
];

/// Looks up the RGB triple for a colour id. Ids are 4-bit by invariant, so
/// only the low nibble is read.
pub fn rgb(id: u8) -> Rgb {
    PALETTE[(id & 0x0f) as usize]
}

/// Returns the id of the palette colour closest to the given RGB triple,
/// by Manhattan distance over the channels. Earliest entry wins ties.
pub fn nearest_colour(red: u8, green: u8, blue: u8) -> u8 {
    let mut best = 0u8;
    let mut best_diff = u32::MAX;
    for (id, entry) in PALETTE.iter().enumerate() {
        let diff = red.abs_diff(entry.red) as u32
            + green.abs_diff(entry.green) as u32
            + blue.abs_diff(entry.blue) as u32;
        if diff < best_diff {
            best_diff = diff;
            best = id as u8;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_masks_to_low_nibble() {
        assert_eq!(rgb(5), PALETTE[5]);
        assert_eq!(rgb(0x15), PALETTE[5]);
    }

    #[test]
    fn nearest_colour_roundtrips_palette_entries() {
        for (id, entry) in PALETTE.iter().enumerate() {
            assert_eq!(
                nearest_colour(entry.red, entry.green, entry.blue),
                id as u8
            );
        }
    }

    #[test]
    fn nearest_colour_picks_closest_entry() {
        // Slightly off-white is still white, not light grey.
        assert_eq!(nearest_colour(250, 250, 250), 0);
        // Deep red lands on the red entry.
        assert_eq!(nearest_colour(200, 10, 10), 5);
    }
}
