//! Host functions that interop benchmark modules import from the `js`
//! namespace. They run on host values, so the adapter lifts the channel's
//! argument taints into the host store before calling them and publishes the
//! taint of what they return afterwards.

use crate::bench::n_body::{self, Vec3};
use crate::bench::{fasta, reverse_complement, spectral_norm};
use crate::error::TaintError;
use crate::host::{HostStore, Tracked};
use crate::shadow::{OutOfBounds, TaintedMemory};
use crate::value::Scalar;

pub const JS_NAMESPACE: &str = "js";
pub const DEBUG_NAMESPACE: &str = "debug";

/// fannkuch-redux: the larger operand. The comparison decides which operand
/// is returned, so the result is tainted when either operand is.
pub fn max(a: Tracked<i32>, b: Tracked<i32>) -> Tracked<i32> {
    let b_wins = b.greater_than(&a);
    let chosen = if *b_wins.value() { b } else { a };
    chosen.zip_with(b_wins, |v, _| v)
}

/// binary-trees: tree nodes at levels with both low bits set get a tainted item.
pub fn should_be_tainted(level: i32) -> bool {
    (level & 0b11) == 0b11
}

/// binary-trees: the item stored in a node built at `level`.
pub fn get_item(store: &mut HostStore, level: Tracked<i32>) -> Tracked<i32> {
    let and_res = level & 0b11;
    if *and_res.value() == 0b11 {
        store.source_value(1)
    } else {
        Tracked::new(1)
    }
}

/// reverse-complement: complement of one nucleotide code, checked against the
/// expected taint of the table entry.
pub fn get_complement_char(store: &mut HostStore, original: Tracked<i32>) -> Result<Tracked<i32>, TaintError> {
    let code = original.map(|c| c as u32);
    let ch = reverse_complement::complement(store, code);
    if reverse_complement::is_sourced_complement(ch.value()) {
        store.assert_is_tainted(&ch)?;
    } else {
        store.assert_is_not_tainted(&ch)?;
    }
    Ok(ch.char_code().map(|c| c as i32))
}

/// Addresses of the mandelbrot loop state inside module memory.
#[derive(Debug, Clone, Copy)]
pub struct LoopPtrs {
    pub zi: usize,
    pub zr: usize,
    pub ti: usize,
    pub tr: usize,
}

/// mandelbrot: one escape-loop step on state that lives in module memory.
///
/// Reads go through the shadow, so taint stored by the module flows into the
/// computation; writes store the results' taint back.
pub fn do_loop(
    store: &mut HostStore,
    memory: &mut TaintedMemory<'_>,
    ptrs: LoopPtrs,
    ci: Tracked<f64>,
    cr: Tracked<f64>,
) -> Result<(), OutOfBounds> {
    let mut load = |addr: usize| -> Result<Tracked<f64>, OutOfBounds> {
        let (value, tainted) = memory.read_f64(addr)?;
        Ok(store.lift(value, tainted))
    };
    let zi = load(ptrs.zi)?;
    let zr = load(ptrs.zr)?;
    let ti = load(ptrs.ti)?;
    let tr = load(ptrs.tr)?;

    let new_zi = 2.0 * zr * zi + ci;
    let new_zr = tr - ti + cr;
    let new_tr = new_zr * new_zr;
    let new_ti = new_zi * new_zi;

    for (addr, value) in [(ptrs.zi, new_zi), (ptrs.zr, new_zr), (ptrs.ti, new_ti), (ptrs.tr, new_tr)] {
        memory.write(addr, Scalar::F64(*value.value()), store.is_tainted(&value))?;
    }
    Ok(())
}

/// Layout of the gene table `selectRandom` searches in module memory.
#[derive(Debug, Clone, Copy)]
pub struct GeneTable {
    pub ptr: usize,
    pub count: usize,
    /// Size of one entry in bytes.
    pub stride: usize,
    pub c_offset: usize,
    pub p_offset: usize,
}

/// fasta: steps the generator whose state lives at `rng` and picks the gene
/// the draw falls on. The state keeps its shadow taint across calls; the
/// returned code is tainted by its entry and by every probability compared
/// on the way to it.
pub fn select_random(
    store: &HostStore,
    memory: &mut TaintedMemory<'_>,
    rng: usize,
    genes: GeneTable,
) -> Result<Tracked<i32>, OutOfBounds> {
    let (last, tainted) = memory.read_u32(rng)?;
    let mut random = fasta::Random::from_state(store.lift(i64::from(last), tainted));
    let r = random.gen_random(1.0);
    let state = random.state();
    memory.write(rng, Scalar::I32(*state.value() as i32), store.is_tainted(&state))?;
    if genes.count == 0 {
        return Ok(Tracked::new(0));
    }

    let entry = |i: usize| genes.ptr + i * genes.stride;
    let index = fasta::select_index(r, genes.count, |i| {
        let (p, tainted) = memory.read_f64(entry(i) + genes.p_offset)?;
        Ok(store.lift(p, tainted))
    })?;
    let (code, tainted) = memory.read_u32(entry(*index.value()) + genes.c_offset)?;
    Ok(store.lift(code as i32, tainted).zip_with(index, |c, _| c))
}

/// spectral-norm: both lanes of `A(i, j)` for the `u32` index pairs at `i`
/// and `j`, stored as two `f64` at `result`. The second lane goes through a
/// sourced array index.
pub fn a_js(store: &mut HostStore, memory: &mut TaintedMemory<'_>, i: usize, j: usize, result: usize) -> anyhow::Result<()> {
    let load = |addr: usize| -> Result<Tracked<f64>, OutOfBounds> {
        let (v, tainted) = memory.read_u32(addr)?;
        Ok(store.lift(f64::from(v), tainted))
    };
    let i = [load(i)?, load(i + 4)?];
    let j = [load(j)?, load(j + 4)?];
    let [v1, v2] = spectral_norm::a(store, &i, &j);
    store.assert_is_tainted(&v2)?;

    let arr = [1, 2, 3].map(Tracked::new);
    let r = Tracked::index(&arr, store.source_value(1usize)).unwrap_or_default();
    store.assert_is_tainted(&r)?;

    memory.write(result, Scalar::F64(*v1.value()), store.is_tainted(&v1))?;
    memory.write(result + 8, Scalar::F64(*v2.value()), store.is_tainted(&v2))?;
    Ok(())
}

/// Addresses of the velocity and mass slots `advanceSingle` updates.
#[derive(Debug, Clone, Copy)]
pub struct PairPtrs {
    pub v1: [usize; 3],
    pub v2: [usize; 3],
    pub mass1: usize,
    pub mass2: usize,
}

/// n-body: the velocity update for one pair of bodies on state in module
/// memory. `dt` is sourced, so every velocity written back is tainted.
pub fn advance_single(
    store: &mut HostStore,
    memory: &mut TaintedMemory<'_>,
    p1: Vec3,
    p2: Vec3,
    ptrs: PairPtrs,
    dt: Tracked<f64>,
) -> Result<(), OutOfBounds> {
    let load = |addr: usize| -> Result<Tracked<f64>, OutOfBounds> {
        let (v, tainted) = memory.read_f64(addr)?;
        Ok(store.lift(v, tainted))
    };
    let mut v1 = [load(ptrs.v1[0])?, load(ptrs.v1[1])?, load(ptrs.v1[2])?];
    let mut v2 = [load(ptrs.v2[0])?, load(ptrs.v2[1])?, load(ptrs.v2[2])?];
    let (mass1, mass2) = (load(ptrs.mass1)?, load(ptrs.mass2)?);

    let dt = store.source(dt);
    n_body::interact(&p1, &p2, &mut v1, &mut v2, mass1, mass2, dt);

    for (addr, v) in ptrs.v1.into_iter().zip(v1).chain(ptrs.v2.into_iter().zip(v2)) {
        memory.write(addr, Scalar::F64(*v.value()), store.is_tainted(&v))?;
    }
    Ok(())
}

/// pi-digits: appends digit `d` to `out` and bumps the `u32` digit counter at
/// `i`; every tenth digit ends its line with the count.
pub fn write_to_file(
    store: &mut HostStore,
    memory: &mut TaintedMemory<'_>,
    d: Tracked<i32>,
    i: usize,
    out: &mut String,
) -> anyhow::Result<()> {
    store.assert_is_tainted(&d)?;
    let (count, tainted) = memory.read_u32(i)?;
    let count = store.lift(count, tainted).map(|c| c.wrapping_add(1));
    memory.write(i, Scalar::I32(*count.value() as i32), store.is_tainted(&count))?;

    out.push_str(&store.sanitize(d).into_inner().to_string());
    if count.value() % 10 == 0 {
        out.push_str(&format!("\t:{}\n", count.value()));
    }
    Ok(())
}
