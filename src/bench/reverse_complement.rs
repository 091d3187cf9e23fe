//! reverse-complement: nucleotide complement table with a fixed set of
//! sourced outputs, applied to every record of a FASTA text.

use crate::bench::fasta;
use crate::error::TaintError;
use crate::host::{HostStore, Tracked};

/// Complements that the table hands out tainted.
const SOURCED: [&str; 8] = ["T", "G", "C", "S", "R", "M", "B", "N"];

pub fn is_sourced_complement(ch: &str) -> bool {
    SOURCED.contains(&ch)
}

/// Complement of the nucleotide with code `code`; unknown codes map to `"\0"`.
pub fn complement(store: &mut HostStore, code: Tracked<u32>) -> Tracked<String> {
    let original = Tracked::from_char_code(code);
    let (out, sourced) = match original.value().to_ascii_uppercase().as_str() {
        "A" => ("T", true),
        "C" => ("G", true),
        "G" => ("C", true),
        "T" | "U" => ("A", false),
        "M" => ("K", false),
        "R" => ("Y", false),
        "W" => ("W", false),
        "S" => ("S", true),
        "Y" => ("R", true),
        "K" => ("M", true),
        "V" => ("B", true),
        "H" => ("D", false),
        "D" => ("H", false),
        "B" => ("V", false),
        "N" => ("N", true),
        _ => ("\0", false),
    };
    if sourced {
        store.source_value(out.to_string())
    } else {
        Tracked::new(out.to_string())
    }
}

/// Reverse complement of `sequence`, checking each complement against the
/// table's taint as it goes. The result is tainted when any complement is.
pub fn reverse_complement(store: &mut HostStore, sequence: &str) -> Result<Tracked<String>, TaintError> {
    let mut out = Tracked::new(String::with_capacity(sequence.len()));
    for ch in sequence.chars().rev().filter(|c| !c.is_whitespace()) {
        let comp = complement(store, Tracked::new(u32::from(ch)));
        if is_sourced_complement(comp.value()) {
            store.assert_is_tainted(&comp)?;
        } else {
            store.assert_is_not_tainted(&comp)?;
        }
        out = out.zip_with(comp, |mut acc, c| {
            acc.push_str(&c);
            acc
        });
    }
    Ok(out)
}

/// Reverse-complements every record of `text`. Headers are copied, sequences
/// are written sanitized in lines of [`fasta::LINE_LENGTH`].
pub fn reverse_complement_fasta(store: &mut HostStore, text: &str) -> Result<String, TaintError> {
    let mut out = String::with_capacity(text.len());
    let mut lines = text.lines().peekable();
    while let Some(header) = lines.next() {
        out.push_str(header);
        out.push('\n');
        let mut sequence = String::new();
        while let Some(line) = lines.next_if(|l| !l.starts_with('>')) {
            sequence.push_str(line);
        }
        let rc = reverse_complement(store, &sequence)?;
        let rc = store.sanitize(rc).into_inner();
        for chunk in rc.as_bytes().chunks(fasta::LINE_LENGTH) {
            out.push_str(&String::from_utf8_lossy(chunk));
            out.push('\n');
        }
    }
    Ok(out)
}

/// Reverse-complements the FASTA text generated for `n`.
pub fn benchmark(store: &mut HostStore, n: i32) -> Result<i64, TaintError> {
    let input = fasta::fasta(store, n.max(0) as usize)?;
    let out = reverse_complement_fasta(store, &input)?;
    tracing::debug!(len = out.len(), "reverse-complement produced its output");
    Ok(0)
}
