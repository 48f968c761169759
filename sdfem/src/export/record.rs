//! Keyword-deck record formatting
use std::{fmt::Display, io::Write};

/// Most entries the solver reads from a single data line
pub const ENTRIES_PER_LINE: usize = 16;

/// Most `node,dof,coefficient` terms on one `*EQUATION` data line
pub const TERMS_PER_LINE: usize = 4;

/// Writes a comma-separated record, wrapping long records
///
/// After every [`ENTRIES_PER_LINE`] entries, the line ends with a trailing
/// comma and the record continues on the next line.  A record which fits on
/// one line has no trailing comma.
pub fn write_record<W: Write, T: Display>(
    out: &mut W,
    entries: impl IntoIterator<Item = T>,
) -> std::io::Result<()> {
    for (i, e) in entries.into_iter().enumerate() {
        if i > 0 {
            if i % ENTRIES_PER_LINE == 0 {
                writeln!(out, ",")?;
            } else {
                write!(out, ",")?;
            }
        }
        write!(out, "{e}")?;
    }
    writeln!(out)
}

/// Writes one `*EQUATION` for a single degree of freedom
///
/// The first line holds the number of terms; the terms follow, at most
/// [`TERMS_PER_LINE`] to a line.  Equation lines never end in a comma.
pub fn write_equation<W: Write>(
    out: &mut W,
    dof: u8,
    terms: &[(u32, f64)],
) -> std::io::Result<()> {
    writeln!(out, "{}", terms.len())?;
    for line in terms.chunks(TERMS_PER_LINE) {
        write_record(
            out,
            line.iter()
                .flat_map(|&(n, c)| [(n + 1).to_string(), dof.to_string(), real(c)]),
        )?;
    }
    Ok(())
}

/// Formats a coordinate or load value
///
/// Values are narrowed to `f32` and printed with the shortest
/// representation that round-trips.
pub fn real(v: f64) -> String {
    format!("{:?}", v as f32)
}

/// Formats a material constant in scientific notation
pub fn sci(v: f64) -> String {
    format!("{v:.6e}")
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(n: usize) -> String {
        let mut out = vec![];
        write_record(&mut out, 1..=n).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn short_record() {
        assert_eq!(record(1), "1\n");
        let s = record(16);
        assert_eq!(s.lines().count(), 1);
        assert!(s.ends_with("15,16\n"));
    }

    #[test]
    fn wrapped_record() {
        let s = record(17);
        let lines: Vec<_> = s.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,");
        assert_eq!(lines[1], "17");

        let s = record(33);
        let lines: Vec<_> = s.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with("32,"));
        assert_eq!(lines[2], "33");
    }

    #[test]
    fn equation() {
        let terms: Vec<_> = (0..9).map(|i| (i, if i == 0 { 1.0 } else { -0.5 })).collect();
        let mut out = vec![];
        write_equation(&mut out, 2, &terms).unwrap();
        let s = String::from_utf8(out).unwrap();
        let lines: Vec<_> = s.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "9");
        assert_eq!(lines[1], "1,2,1.0,2,2,-0.5,3,2,-0.5,4,2,-0.5");
        assert_eq!(lines[3], "9,2,-0.5");
    }

    #[test]
    fn numbers() {
        assert_eq!(real(1.0), "1.0");
        assert_eq!(real(0.1), "0.1");
        assert_eq!(real(-2.5e-7), "-2.5e-7");
        assert_eq!(sci(210000.0), "2.100000e5");
        assert_eq!(sci(7.85e-9), "7.850000e-9");
    }
}
