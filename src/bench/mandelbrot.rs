use crate::error::TaintError;
use crate::host::{HostStore, Tracked};

const LIMIT: f64 = 2.0;
const MAX_ITERATIONS: u32 = 50;
pub const PASSES: i32 = 10;

/// State of the escape loop for one pixel.
#[derive(Debug, Clone, Copy, Default)]
struct LoopBody {
    zi: Tracked<f64>,
    zr: Tracked<f64>,
    ti: Tracked<f64>,
    tr: Tracked<f64>,
    ci: Tracked<f64>,
    cr: Tracked<f64>,
}
impl LoopBody {
    fn step(&mut self) {
        self.zi = 2.0 * self.zr * self.zi + self.ci;
        self.zr = self.tr - self.ti + self.cr;
        self.tr = self.zr * self.zr;
        self.ti = self.zi * self.zi;
    }
    fn escaped(&self) -> bool {
        *(self.tr + self.ti).value() > LIMIT * LIMIT
    }
}

/// One pass over an `n`x`n` image; returns the sum of the packed output bytes.
pub fn mandelbrot(store: &mut HostStore, n: Tracked<i32>) -> Tracked<i32> {
    let w = *n.value();
    let h = w;
    let mut bit_num = 0;
    let mut byte_acc = Tracked::new(0i32);
    let mut result = Tracked::new(0i32);

    for y in 0..h {
        for x in 0..w {
            let mut body = LoopBody {
                zi: store.source_value(0.0),
                cr: Tracked::new(2.0 * x as f64 / w as f64 - 1.5),
                ci: Tracked::new(2.0 * y as f64 / h as f64 - 1.0),
                ..LoopBody::default()
            };
            let mut i = 0;
            while i < MAX_ITERATIONS && !body.escaped() {
                body.step();
                i += 1;
            }

            byte_acc <<= 1;
            if !body.escaped() {
                byte_acc |= 0x01;
                if store.is_tainted(&body.tr) && store.is_tainted(&n) {
                    byte_acc = store.source(byte_acc);
                }
            }

            bit_num += 1;
            if bit_num == 8 {
                result += byte_acc;
                byte_acc = Tracked::new(0);
                bit_num = 0;
            } else if x == w - 1 {
                byte_acc <<= 8 - (w % 8);
                result += byte_acc;
                byte_acc = Tracked::new(0);
                bit_num = 0;
            }
        }
    }
    result
}

pub fn benchmark(store: &mut HostStore, n: i32) -> Result<i64, TaintError> {
    let mut n = Tracked::new(n);
    let mut sum = Tracked::new(0i64);
    for i in 0..PASSES {
        if i & 0x11 != 0 {
            n = store.source(n);
        }
        sum += mandelbrot(store, n).map(i64::from);
    }
    store.assert_is_tainted(&sum)?;
    Ok(store.sanitize(sum).into_inner())
}
