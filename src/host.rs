use std::fmt::{Debug, Display, Formatter};
use std::ops::{
    Add, AddAssign, BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Div, DivAssign, Mul, MulAssign,
    Neg, Rem, RemAssign, Shl, ShlAssign, Shr, ShrAssign, Sub, SubAssign,
};
use std::sync::atomic::{AtomicU32, Ordering};
use crate::error::{expect_taint, Expectation, TaintError};

static NEXT_STORE_ID: AtomicU32 = AtomicU32::new(1);

/// Marks a host value as tainted by the [`HostStore`] that issued it.
///
/// The handle is the whole taint record: a value is tainted when it carries a
/// handle of the store that asks. Nothing is kept per value on the store side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    store: u32,
}
impl Display for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.store)
    }
}

/// A host value together with the handle of the source it derives from.
///
/// Values that never touched a source carry no handle. Copies share the
/// handle, so every copy answers the same taint query. Arithmetic through the
/// operator impls below keeps the handle of the first tainted operand.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tracked<T> {
    value: T,
    handle: Option<Handle>,
}

impl<T> Tracked<T> {
    /// An untracked value.
    pub fn new(value: T) -> Self {
        Self { value, handle: None }
    }
    pub fn value(&self) -> &T {
        &self.value
    }
    pub fn into_inner(self) -> T {
        self.value
    }
    pub fn handle(&self) -> Option<Handle> {
        self.handle
    }

    /// Derives a value from this one alone.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Tracked<U> {
        Tracked { value: f(self.value), handle: self.handle }
    }

    /// Derives a value from two operands; tainted if either one is.
    pub fn zip_with<U, R>(self, other: Tracked<U>, f: impl FnOnce(T, U) -> R) -> Tracked<R> {
        Tracked {
            value: f(self.value, other.value),
            handle: self.handle.or(other.handle),
        }
    }

    /// Reads `container[index]`. The result is tainted when either the element
    /// or the index is.
    pub fn index(container: &[Tracked<T>], index: Tracked<usize>) -> Option<Tracked<T>>
    where
        T: Clone,
    {
        let elem = container.get(index.value)?;
        Some(Tracked {
            value: elem.value.clone(),
            handle: elem.handle.or(index.handle),
        })
    }
}
impl<T: PartialOrd> Tracked<T> {
    fn compare(&self, other: &Tracked<T>, f: impl FnOnce(&T, &T) -> bool) -> Tracked<bool> {
        Tracked {
            value: f(&self.value, &other.value),
            handle: self.handle.or(other.handle),
        }
    }
    pub fn less_than(&self, other: &Tracked<T>) -> Tracked<bool> {
        self.compare(other, |a, b| a < b)
    }
    pub fn less_eq(&self, other: &Tracked<T>) -> Tracked<bool> {
        self.compare(other, |a, b| a <= b)
    }
    pub fn greater_than(&self, other: &Tracked<T>) -> Tracked<bool> {
        self.compare(other, |a, b| a > b)
    }
    pub fn greater_eq(&self, other: &Tracked<T>) -> Tracked<bool> {
        self.compare(other, |a, b| a >= b)
    }
    pub fn equals(&self, other: &Tracked<T>) -> Tracked<bool> {
        self.compare(other, |a, b| a == b)
    }
}
impl Tracked<String> {
    pub fn concat(&self, other: &Tracked<String>) -> Tracked<String> {
        Tracked {
            value: format!("{}{}", self.value, other.value),
            handle: self.handle.or(other.handle),
        }
    }
    /// `String.fromCharCode` for a single code unit.
    pub fn from_char_code(code: Tracked<u32>) -> Tracked<String> {
        code.map(|c| char::from_u32(c).map(String::from).unwrap_or_default())
    }
    /// `s.charCodeAt(0)`; a missing character reads as 0.
    pub fn char_code(&self) -> Tracked<u32> {
        Tracked {
            value: self.value.chars().next().map(u32::from).unwrap_or(0),
            handle: self.handle,
        }
    }
}
impl<T> From<T> for Tracked<T> {
    fn from(value: T) -> Self {
        Tracked::new(value)
    }
}
impl<T: Display> Display for Tracked<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.handle {
            Some(handle) => write!(f, "{}{}", self.value, handle),
            None => write!(f, "{}", self.value),
        }
    }
}

macro_rules! contagious_binop {
    ($($trait:ident $method:ident, $assign:ident $assign_method:ident);* $(;)?) => {$(
        impl<T: $trait<Output = T>> $trait for Tracked<T> {
            type Output = Tracked<T>;
            fn $method(self, rhs: Tracked<T>) -> Tracked<T> {
                Tracked { value: $trait::$method(self.value, rhs.value), handle: self.handle.or(rhs.handle) }
            }
        }
        impl<T: $assign> $assign for Tracked<T> {
            fn $assign_method(&mut self, rhs: Tracked<T>) {
                $assign::$assign_method(&mut self.value, rhs.value);
                self.handle = self.handle.or(rhs.handle);
            }
        }
    )*};
}
contagious_binop!(
    Add add, AddAssign add_assign;
    Sub sub, SubAssign sub_assign;
    Mul mul, MulAssign mul_assign;
    Div div, DivAssign div_assign;
    Rem rem, RemAssign rem_assign;
    BitAnd bitand, BitAndAssign bitand_assign;
    BitOr bitor, BitOrAssign bitor_assign;
    BitXor bitxor, BitXorAssign bitxor_assign;
    Shl shl, ShlAssign shl_assign;
    Shr shr, ShrAssign shr_assign;
);

// Literal operands never carry taint, so the tracked side's handle survives.
macro_rules! literal_operand {
    ($ty:ty => $($trait:ident $method:ident, $assign:ident $assign_method:ident);* $(;)?) => {$(
        impl $trait<$ty> for Tracked<$ty> {
            type Output = Tracked<$ty>;
            fn $method(self, rhs: $ty) -> Tracked<$ty> {
                Tracked { value: $trait::$method(self.value, rhs), handle: self.handle }
            }
        }
        impl $trait<Tracked<$ty>> for $ty {
            type Output = Tracked<$ty>;
            fn $method(self, rhs: Tracked<$ty>) -> Tracked<$ty> {
                Tracked { value: $trait::$method(self, rhs.value), handle: rhs.handle }
            }
        }
        impl $assign<$ty> for Tracked<$ty> {
            fn $assign_method(&mut self, rhs: $ty) {
                $assign::$assign_method(&mut self.value, rhs);
            }
        }
    )*};
}
literal_operand!(i32 =>
    Add add, AddAssign add_assign;
    Sub sub, SubAssign sub_assign;
    Mul mul, MulAssign mul_assign;
    Div div, DivAssign div_assign;
    Rem rem, RemAssign rem_assign;
    BitAnd bitand, BitAndAssign bitand_assign;
    BitOr bitor, BitOrAssign bitor_assign;
    Shl shl, ShlAssign shl_assign;
    Shr shr, ShrAssign shr_assign;
);
literal_operand!(i64 =>
    Add add, AddAssign add_assign;
    Sub sub, SubAssign sub_assign;
    Mul mul, MulAssign mul_assign;
    Div div, DivAssign div_assign;
    Rem rem, RemAssign rem_assign;
    BitAnd bitand, BitAndAssign bitand_assign;
    BitOr bitor, BitOrAssign bitor_assign;
    Shl shl, ShlAssign shl_assign;
    Shr shr, ShrAssign shr_assign;
);
literal_operand!(f64 =>
    Add add, AddAssign add_assign;
    Sub sub, SubAssign sub_assign;
    Mul mul, MulAssign mul_assign;
    Div div, DivAssign div_assign;
    Rem rem, RemAssign rem_assign;
);

impl<T: Neg<Output = T>> Neg for Tracked<T> {
    type Output = Tracked<T>;
    fn neg(self) -> Tracked<T> {
        self.map(|v| -v)
    }
}

/// Taint authority for host values of one benchmark-variant run.
///
/// Every source hands out the store's own [`Handle`], so memory use does not
/// depend on how many values are sourced or lifted. Handles minted by another
/// store are never honoured: they read as untainted.
#[derive(Debug)]
pub struct HostStore {
    id: u32,
    sources: u64,
    live: bool,
}
impl Default for HostStore {
    fn default() -> Self {
        Self::new()
    }
}
impl HostStore {
    pub fn new() -> Self {
        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            sources: 0,
            live: true,
        }
    }

    /// A store for runs whose mode does not track host values: sources and
    /// sanitizers pass values through and every assertion holds.
    pub fn inert() -> Self {
        Self { live: false, ..Self::new() }
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Number of `source` calls so far. Lifted values are not counted.
    pub fn sources(&self) -> u64 {
        self.sources
    }

    fn handle(&self) -> Handle {
        Handle { store: self.id }
    }

    /// `Taint.source`: marks `value` tainted. Content is unchanged.
    pub fn source<T>(&mut self, value: Tracked<T>) -> Tracked<T> {
        if !self.live {
            return value;
        }
        self.sources += 1;
        Tracked { value: value.value, handle: Some(self.handle()) }
    }

    /// [`HostStore::source`] for a value that was never tracked.
    pub fn source_value<T>(&mut self, value: T) -> Tracked<T> {
        self.source(Tracked::new(value))
    }

    /// Brings a value with a known taint flag (e.g. read from the channel or
    /// the shadow memory) into the host value space.
    pub fn lift<T>(&self, value: T, tainted: bool) -> Tracked<T> {
        Tracked {
            value,
            handle: (tainted && self.live).then(|| self.handle()),
        }
    }

    /// `Taint.sanitize`: returns the content with no taint attached.
    pub fn sanitize<T>(&mut self, value: Tracked<T>) -> Tracked<T> {
        Tracked::new(value.value)
    }

    /// `Taint.checkIsTainted`.
    pub fn is_tainted<T>(&self, value: &Tracked<T>) -> bool {
        let Some(handle) = value.handle else {
            return false;
        };
        if handle != self.handle() {
            tracing::warn!(%handle, store = self.id, "ignoring a handle from another run");
            return false;
        }
        true
    }

    /// `Taint.assertIsTainted`.
    pub fn assert_is_tainted<T: Debug>(&self, value: &Tracked<T>) -> Result<(), TaintError> {
        self.expect(Expectation::Tainted, value)
    }

    /// `Taint.assertIsNotTainted`.
    pub fn assert_is_not_tainted<T: Debug>(&self, value: &Tracked<T>) -> Result<(), TaintError> {
        self.expect(Expectation::NotTainted, value)
    }

    fn expect<T: Debug>(&self, expected: Expectation, value: &Tracked<T>) -> Result<(), TaintError> {
        if !self.live {
            return Ok(());
        }
        expect_taint(expected, self.is_tainted(value), || format!("host value {:?}", value.value))
    }
}
