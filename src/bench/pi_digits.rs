use std::fmt::Write;
use num_bigint::BigInt;
use crate::error::TaintError;
use crate::host::{HostStore, Tracked};

fn big(v: i64) -> Tracked<BigInt> {
    Tracked::new(BigInt::from(v))
}

/// `floor((num * nth + acc) / den)`, plus the intermediates it went through.
fn extract_digit(num: &Tracked<BigInt>, acc: &Tracked<BigInt>, den: &Tracked<BigInt>, nth: i64) -> (Tracked<BigInt>, Tracked<BigInt>) {
    let tmp1 = num.clone() * big(nth);
    let tmp2 = tmp1 + acc.clone();
    let tmp1 = tmp2.clone() / den.clone();
    (tmp1, tmp2)
}

fn to_digit(v: &Tracked<BigInt>) -> Tracked<u32> {
    v.clone().map(|b| u32::try_from(&b).unwrap_or(0))
}

/// Prints the first `n` digits of pi in the usual ten-per-line format.
///
/// Every big-integer accumulator is sourced at the start, so the digits are
/// all derived from tainted state while the loop counters stay clean.
pub fn pi_digits(store: &mut HostStore, n: u32) -> Result<String, TaintError> {
    let mut out = String::new();
    let mut i = Tracked::new(0u32);
    let mut k = Tracked::new(0i64);
    let mut d = Tracked::new(0u32);
    let mut d3 = Tracked::new(0u32);
    let mut d4 = Tracked::new(0u32);

    let mut tmp1 = store.source_value(BigInt::from(0));
    let mut tmp2 = store.source_value(BigInt::from(0));
    let mut acc = store.source_value(BigInt::from(0));
    let mut den = store.source_value(BigInt::from(1));
    let mut num = store.source_value(BigInt::from(1));

    while *i.value() < n {
        k += 1;

        let k2 = k * 2 + 1;
        acc = acc + num.clone() * big(2);
        acc = acc * k2.map(BigInt::from);
        den = den * k2.map(BigInt::from);
        num = num * k.map(BigInt::from);

        if num.value() > acc.value() {
            continue;
        }

        let (third, _) = extract_digit(&num, &acc, &den, 3);
        d3 = to_digit(&third);
        d = d3;

        (tmp1, tmp2) = extract_digit(&num, &acc, &den, 4);
        d4 = to_digit(&tmp1);

        if d.value() != d4.value() {
            continue;
        }

        let _ = write!(out, "{}", store.sanitize(d).into_inner());
        i = i.map(|v| v + 1);
        if i.value() % 10 == 0 {
            let _ = writeln!(out, "\t:{}", i.value());
        }

        acc = acc - den.clone() * d.map(BigInt::from);
        acc = acc * big(10);
        num = num * big(10);
    }

    store.assert_is_not_tainted(&i)?;
    store.assert_is_not_tainted(&k)?;
    store.assert_is_tainted(&d)?;
    store.assert_is_tainted(&d3)?;
    store.assert_is_tainted(&d4)?;
    store.assert_is_tainted(&tmp1)?;
    store.assert_is_tainted(&tmp2)?;
    store.assert_is_tainted(&acc)?;
    store.assert_is_tainted(&den)?;
    store.assert_is_tainted(&num)?;
    Ok(out)
}

/// Runs [`pi_digits`] and reports 0, the digits being a side output.
pub fn benchmark(store: &mut HostStore, n: i32) -> Result<i64, TaintError> {
    let digits = pi_digits(store, n.max(0) as u32)?;
    tracing::debug!(len = digits.len(), "pi-digits produced its output");
    Ok(0)
}
