//! Variant stream serialization (§6 "Outputs produced by the core"): a
//! line-separated, self-describing representation that round-trips a
//! `Variant` exactly (save for the external reference object, re-attached
//! from the fasta index on read).

use std::io::{BufRead, Write};

use crate::model::variant::Variant;

/// Writes one JSON object per line, one line per variant.
pub fn write_variants<W: Write>(mut out: W, variants: &[Variant]) -> anyhow::Result<()> {
    for variant in variants {
        serde_json::to_writer(&mut out, variant)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Reads variants from a newline-delimited JSON stream, in order. Blank
/// lines are skipped.
pub fn read_variants<R: BufRead>(input: R) -> anyhow::Result<Vec<Variant>> {
    let mut variants = Vec::new();
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        variants.push(serde_json::from_str(&line)?);
    }
    Ok(variants)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::variant::{AlleleEvidence, AlleleKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_a_variant_with_filters_and_cap_enzymes() {
        let mut v = Variant::new("chr1", 42);
        let mut ev = AlleleEvidence::default();
        ev.push("r1", "lib1", true, Some(30), 60);
        v.alleles.insert(("a".to_owned(), AlleleKind::Invariant), ev);
        v.cap_enzymes = Some(["EcoRI".to_owned()].into_iter().collect());

        let mut buf = Vec::new();
        write_variants(&mut buf, std::slice::from_ref(&v)).unwrap();
        let read_back = read_variants(buf.as_slice()).unwrap();

        assert_eq!(read_back.len(), 1);
        assert_eq!(read_back[0], v);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let input = "\n\n";
        assert!(read_variants(input.as_bytes()).unwrap().is_empty());
    }
}
