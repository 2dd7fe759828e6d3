/// BDF (Glyph Bitmap Distribution Format) parser.
/// Reads the subset LED matrix fonts use: global ascent/descent, and per
/// glyph ENCODING, DWIDTH, BBX and BITMAP.
use tracing::debug;

use super::bitmap::{BitmapFont, BitmapGlyph};

#[derive(Default)]
struct PendingGlyph {
    encoding: Option<u32>,
    advance: Option<i32>,
    bbx: Option<(u32, u32, i32, i32)>,
    rows: Vec<u8>,
}

fn numbers<const N: usize>(
    line_no: usize,
    keyword: &str,
    args: &[&str],
) -> Result<[i32; N], String> {
    if args.len() < N {
        return Err(format!("line {line_no}: {keyword} expects {N} values"));
    }
    let mut out = [0i32; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg
            .parse()
            .map_err(|_| format!("line {line_no}: {keyword} has non-numeric value '{arg}'"))?;
    }
    Ok(out)
}

fn hex_row(line_no: usize, line: &str, bytes_per_row: usize) -> Result<Vec<u8>, String> {
    let line = line.trim();
    let mut row = Vec::with_capacity(bytes_per_row);
    for i in 0..bytes_per_row {
        let byte = line
            .get(i * 2..i * 2 + 2)
            .map(|pair| u8::from_str_radix(pair, 16))
            .unwrap_or(Ok(0))
            .map_err(|_| format!("line {line_no}: invalid bitmap row '{line}'"))?;
        row.push(byte);
    }
    Ok(row)
}

/// Parse BDF source text into a bitmap font.
pub fn parse(source: &str) -> Result<BitmapFont, String> {
    let mut lines = source.lines().enumerate().map(|(i, l)| (i + 1, l));

    match lines.next() {
        Some((_, first)) if first.trim_start().starts_with("STARTFONT") => {}
        _ => return Err("missing STARTFONT header".to_string()),
    }

    let mut bounding_box: Option<[i32; 4]> = None;
    let mut ascent: Option<i32> = None;
    let mut descent: Option<i32> = None;
    let mut default_char: Option<u32> = None;
    let mut glyphs: Vec<(u32, BitmapGlyph)> = Vec::new();
    let mut pending: Option<PendingGlyph> = None;
    let mut in_bitmap = false;

    for (line_no, line) in lines {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };
        let args: Vec<&str> = parts.collect();

        if in_bitmap {
            if keyword == "ENDCHAR" {
                in_bitmap = false;
                if let Some(glyph) = pending.take() {
                    finish_glyph(glyph, bounding_box, &mut glyphs);
                }
            } else if let Some(glyph) = pending.as_mut() {
                let width = glyph.bbx.map(|b| b.0).unwrap_or(0);
                let row = hex_row(line_no, line, (width as usize).div_ceil(8))?;
                glyph.rows.extend(row);
            }
            continue;
        }

        match keyword {
            "FONTBOUNDINGBOX" => bounding_box = Some(numbers::<4>(line_no, keyword, &args)?),
            "FONT_ASCENT" => ascent = Some(numbers::<1>(line_no, keyword, &args)?[0]),
            "FONT_DESCENT" => descent = Some(numbers::<1>(line_no, keyword, &args)?[0]),
            "DEFAULT_CHAR" => {
                default_char = numbers::<1>(line_no, keyword, &args)
                    .ok()
                    .and_then(|[c]| u32::try_from(c).ok());
            }
            "STARTCHAR" => pending = Some(PendingGlyph::default()),
            "ENCODING" => {
                if let Some(glyph) = pending.as_mut() {
                    let [code] = numbers::<1>(line_no, keyword, &args)?;
                    // -1 marks glyphs outside the standard encoding
                    glyph.encoding = u32::try_from(code).ok();
                }
            }
            "DWIDTH" => {
                if let Some(glyph) = pending.as_mut() {
                    glyph.advance = Some(numbers::<1>(line_no, keyword, &args)?[0]);
                }
            }
            "BBX" => {
                if let Some(glyph) = pending.as_mut() {
                    let [w, h, xo, yo] = numbers::<4>(line_no, keyword, &args)?;
                    if w < 0 || h < 0 {
                        return Err(format!("line {line_no}: negative BBX size"));
                    }
                    glyph.bbx = Some((w as u32, h as u32, xo, yo));
                }
            }
            "BITMAP" => in_bitmap = pending.is_some(),
            "ENDCHAR" => {
                if let Some(glyph) = pending.take() {
                    finish_glyph(glyph, bounding_box, &mut glyphs);
                }
            }
            "ENDFONT" => break,
            _ => {}
        }
    }

    if glyphs.is_empty() {
        return Err("font contains no glyphs".to_string());
    }

    let (font_ascent, font_descent) = match (ascent, descent, bounding_box) {
        (Some(a), Some(d), _) => (a, d),
        (_, _, Some([_, h, _, yo])) => (h + yo, -yo),
        _ => return Err("font has no FONT_ASCENT/FONT_DESCENT or FONTBOUNDINGBOX".to_string()),
    };

    let mut font = BitmapFont::new(font_ascent, font_descent);
    let count = glyphs.len();
    for (code, glyph) in glyphs {
        if let Some(ch) = char::from_u32(code) {
            font.insert(ch, glyph);
        }
    }
    let fallback = default_char
        .and_then(char::from_u32)
        .filter(|c| font.glyph(*c).is_some())
        .or_else(|| Some('?').filter(|c| font.glyph(*c).is_some()));
    if let Some(ch) = fallback {
        font = font.with_default_char(ch);
    }

    debug!(
        "Parsed BDF font: {} glyphs, ascent {}, descent {}",
        count, font_ascent, font_descent
    );
    Ok(font)
}

fn finish_glyph(
    glyph: PendingGlyph,
    bounding_box: Option<[i32; 4]>,
    out: &mut Vec<(u32, BitmapGlyph)>,
) {
    let Some(code) = glyph.encoding else {
        return;
    };
    let (width, height, x_offset, y_offset) = glyph
        .bbx
        .or_else(|| bounding_box.map(|[w, h, xo, yo]| (w.max(0) as u32, h.max(0) as u32, xo, yo)))
        .unwrap_or((0, 0, 0, 0));
    let advance = glyph.advance.unwrap_or(width as i32);
    out.push((
        code,
        BitmapGlyph::new(advance, width, height, x_offset, y_offset, glyph.rows),
    ));
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two glyphs: a 3x3 'A' and an empty space, 4px advance
    pub(crate) const TINY_BDF: &str = "STARTFONT 2.1
FONT -misc-tiny-medium-r-normal--4-40-75-75-c-40-iso10646-1
SIZE 4 75 75
FONTBOUNDINGBOX 3 4 0 -1
STARTPROPERTIES 2
FONT_ASCENT 3
FONT_DESCENT 1
ENDPROPERTIES
CHARS 2
STARTCHAR space
ENCODING 32
SWIDTH 1000 0
DWIDTH 4 0
BBX 0 0 0 0
BITMAP
ENDCHAR
STARTCHAR A
ENCODING 65
SWIDTH 1000 0
DWIDTH 4 0
BBX 3 3 0 0
BITMAP
40
A0
E0
ENDCHAR
ENDFONT
";

    #[test]
    fn test_parse_tiny_font() {
        let font = parse(TINY_BDF).unwrap();
        assert_eq!(font.len(), 2);
        assert_eq!(font.ascent, 3);
        assert_eq!(font.descent, 1);

        let a = font.glyph('A').unwrap();
        assert_eq!((a.width, a.height, a.advance), (3, 3, 4));
        assert!(a.is_set(1, 0));
        assert!(!a.is_set(0, 0));
        assert!(a.is_set(0, 2) && a.is_set(1, 2) && a.is_set(2, 2));

        // "AA": 4px advance + 3px glyph
        let bounds = font.measure("AA").unwrap();
        assert_eq!(bounds.max_x - bounds.min_x, 7);
    }

    #[test]
    fn test_rejects_non_bdf() {
        assert!(parse("hello").is_err());
        assert!(parse("STARTFONT 2.1\nENDFONT\n").is_err());
    }

    #[test]
    fn test_bad_bbx_reports_line() {
        let source = TINY_BDF.replace("BBX 3 3 0 0", "BBX 3 x 0 0");
        let err = parse(&source).err().unwrap();
        assert!(err.contains("line 21"), "{err}");
    }

    #[test]
    fn test_ascent_from_bounding_box() {
        let source = TINY_BDF
            .replace("FONT_ASCENT 3\n", "")
            .replace("FONT_DESCENT 1\n", "");
        let font = parse(&source).unwrap();
        assert_eq!((font.ascent, font.descent), (3, 1));
    }
}
