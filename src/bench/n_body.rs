//! n-body: Jovian planets orbiting the sun. Every position coordinate is
//! sourced, velocities and masses start clean and pick up taint from the
//! positions during the first step.

use std::f64::consts::PI;
use crate::error::TaintError;
use crate::host::{HostStore, Tracked};

const SOLAR_MASS: f64 = 4.0 * PI * PI;
const DAYS_PER_YEAR: f64 = 365.24;
const DT: f64 = 0.01;

pub type Vec3 = [Tracked<f64>; 3];

#[derive(Debug, Clone, Copy)]
pub struct Body {
    pub pos: Vec3,
    pub vel: Vec3,
    pub mass: Tracked<f64>,
}

/// Updates the velocities of two bodies for their mutual attraction over one
/// step. `mag` is `dt / r^3`.
pub fn interact(p1: &Vec3, p2: &Vec3, v1: &mut Vec3, v2: &mut Vec3, m1: Tracked<f64>, m2: Tracked<f64>, dt: Tracked<f64>) {
    let dx = p1[0] - p2[0];
    let dy = p1[1] - p2[1];
    let dz = p1[2] - p2[2];
    let r = (dx * dx + dy * dy + dz * dz).map(f64::sqrt);
    let mag = dt / (r * r * r);
    for (k, d) in [dx, dy, dz].into_iter().enumerate() {
        v1[k] = v1[k] - d * m2 * mag;
        v2[k] = v2[k] + d * m1 * mag;
    }
}

fn body(store: &mut HostStore, pos: [f64; 3], vel: [f64; 3], mass: f64) -> Body {
    Body {
        pos: pos.map(|p| store.source_value(p)),
        vel: vel.map(|v| Tracked::new(v * DAYS_PER_YEAR)),
        mass: Tracked::new(mass * SOLAR_MASS),
    }
}

pub fn system(store: &mut HostStore) -> Vec<Body> {
    let mut bodies = vec![
        body(store, [0.0; 3], [0.0; 3], 1.0),
        // jupiter
        body(
            store,
            [4.84143144246472090e+00, -1.16032004402742839e+00, -1.03622044471123109e-01],
            [1.66007664274403694e-03, 7.69901118419740425e-03, -6.90460016972063023e-05],
            9.54791938424326609e-04,
        ),
        // saturn
        body(
            store,
            [8.34336671824457987e+00, 4.12479856412430479e+00, -4.03523417114321381e-01],
            [-2.76742510726862411e-03, 4.99852801234917238e-03, 2.30417297573763929e-05],
            2.85885980666130812e-04,
        ),
        // uranus
        body(
            store,
            [1.28943695621391310e+01, -1.51111514016986312e+01, -2.23307578892655734e-01],
            [2.96460137564761618e-03, 2.37847173959480950e-03, -2.96589568540237556e-05],
            4.36624404335156298e-05,
        ),
        // neptune
        body(
            store,
            [1.53796971148509165e+01, -2.59193146099879641e+01, 1.79258772950371181e-01],
            [2.68067772490389322e-03, 1.62824170038242295e-03, -9.51592254519715870e-05],
            5.15138902046611451e-05,
        ),
    ];
    offset_momentum(&mut bodies);
    bodies
}

fn offset_momentum(bodies: &mut [Body]) {
    let mut p = [Tracked::new(0.0); 3];
    for b in bodies.iter() {
        for k in 0..3 {
            p[k] += b.vel[k] * b.mass;
        }
    }
    if let Some(sun) = bodies.first_mut() {
        for k in 0..3 {
            sun.vel[k] = -p[k] / SOLAR_MASS;
        }
    }
}

pub fn advance(bodies: &mut [Body], dt: f64) {
    for i in 0..bodies.len() {
        let (head, tail) = bodies.split_at_mut(i + 1);
        let b1 = &mut head[i];
        for b2 in tail {
            interact(&b1.pos, &b2.pos, &mut b1.vel, &mut b2.vel, b1.mass, b2.mass, Tracked::new(dt));
        }
    }
    for b in bodies.iter_mut() {
        for k in 0..3 {
            b.pos[k] = b.pos[k] + dt * b.vel[k];
        }
    }
}

pub fn energy(bodies: &[Body]) -> Tracked<f64> {
    let mut e = Tracked::new(0.0);
    for (i, b1) in bodies.iter().enumerate() {
        let [vx, vy, vz] = b1.vel;
        e += 0.5 * b1.mass * (vx * vx + vy * vy + vz * vz);
        for b2 in &bodies[i + 1..] {
            let dx = b1.pos[0] - b2.pos[0];
            let dy = b1.pos[1] - b2.pos[1];
            let dz = b1.pos[2] - b2.pos[2];
            let distance = (dx * dx + dy * dy + dz * dz).map(f64::sqrt);
            e -= (b1.mass * b2.mass) / distance;
        }
    }
    e
}

/// Energy of the system after `n + 1` steps.
pub fn benchmark(store: &mut HostStore, n: i32) -> Result<f64, TaintError> {
    let mut bodies = system(store);
    for _ in 0..=n.max(0) {
        advance(&mut bodies, DT);
    }
    let e = energy(&bodies);
    for b in &bodies {
        for p in &b.pos {
            store.assert_is_tainted(p)?;
        }
    }
    Ok(store.sanitize(e).into_inner())
}
