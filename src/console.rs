// THEORY:
// A tiny diagnostic renderer: paints an RGB buffer into a truecolor-capable
// terminal using SGR 48;2 background sequences, two columns per pixel so the
// aspect ratio roughly survives. This is a convenience for watching the
// spotlight from a shell; the real output surface is the raw RGB buffer
// handed to the display layer.

use std::io::{self, Write};

/// Writes the buffer as coloured terminal cells, one row per pixel row.
/// `rgb` is row-major with three bytes per pixel.
pub fn render_rgb(out: &mut impl Write, rgb: &[u8], width: u32, height: u32) -> io::Result<()> {
    for y in 0..height {
        for x in 0..width {
            let offset = ((y * width + x) * 3) as usize;
            write!(
                out,
                "\x1b[48;2;{};{};{}m  ",
                rgb[offset],
                rgb[offset + 1],
                rgb[offset + 2]
            )?;
        }
        // Reset the background before the newline so the colour does not
        // bleed across the rest of the terminal line.
        writeln!(out, "\x1b[49m")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_cell_per_pixel_with_reset_per_row() {
        let mut out = Vec::new();
        render_rgb(&mut out, &[255, 0, 0, 0, 255, 0], 2, 1).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "\x1b[48;2;255;0;0m  \x1b[48;2;0;255;0m  \x1b[49m\n");
    }
}
