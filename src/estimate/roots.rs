use crate::estimate::polyfit::Polynomial;

const MAX_ITERATIONS: usize = 500;
const CONVERGENCE_TOL: f64 = 1e-14;
/// Relative size below which an imaginary part is treated as zero.
const REAL_TOL: f64 = 1e-7;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Root {
    pub re: f64,
    pub im: f64,
}

impl Root {
    pub fn is_real(&self) -> bool {
        self.im.abs() <= REAL_TOL * self.re.abs().max(1.0)
    }
}

#[derive(Clone, Copy, Debug)]
struct Complex {
    re: f64,
    im: f64,
}

impl Complex {
    fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
    fn add(self, o: Complex) -> Complex {
        Complex::new(self.re + o.re, self.im + o.im)
    }
    fn sub(self, o: Complex) -> Complex {
        Complex::new(self.re - o.re, self.im - o.im)
    }
    fn mul(self, o: Complex) -> Complex {
        Complex::new(
            self.re * o.re - self.im * o.im,
            self.re * o.im + self.im * o.re,
        )
    }
    fn div(self, o: Complex) -> Complex {
        let d = o.re * o.re + o.im * o.im;
        Complex::new(
            (self.re * o.re + self.im * o.im) / d,
            (self.im * o.re - self.re * o.im) / d,
        )
    }
    fn norm(self) -> f64 {
        self.re.hypot(self.im)
    }
}

/// All roots of `p`, ordered by descending real part (ties: descending
/// imaginary part). Leading coefficients that vanish relative to the rest are
/// dropped first, so a fitted quadratic that is really a line yields one root.
pub fn roots(p: &Polynomial) -> Vec<Root> {
    let coeffs = trimmed(p.ascending());
    let mut out = match coeffs.len() {
        0 | 1 => Vec::new(),
        2 => vec![Root {
            re: -coeffs[0] / coeffs[1],
            im: 0.0,
        }],
        3 => quadratic(coeffs[2], coeffs[1], coeffs[0]),
        _ => durand_kerner(coeffs),
    };
    out.sort_by(|a, b| b.re.total_cmp(&a.re).then(b.im.total_cmp(&a.im)));
    out
}

/// Real roots only, in the same order as `roots`.
pub fn real_roots(p: &Polynomial) -> Vec<f64> {
    roots(p)
        .into_iter()
        .filter(|r| r.is_real() && r.re.is_finite())
        .map(|r| polish(p, r.re))
        .collect()
}

fn trimmed(coeffs: &[f64]) -> &[f64] {
    let scale = coeffs.iter().fold(0.0f64, |m, c| m.max(c.abs()));
    let mut end = coeffs.len();
    while end > 0 && coeffs[end - 1].abs() <= scale * 1e-13 {
        end -= 1;
    }
    &coeffs[..end]
}

fn quadratic(a: f64, b: f64, c: f64) -> Vec<Root> {
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        let re = -b / (2.0 * a);
        let im = (-disc).sqrt() / (2.0 * a.abs());
        return vec![Root { re, im }, Root { re, im: -im }];
    }
    // Avoids cancellation between -b and the square root.
    let q = -0.5 * (b + b.signum() * disc.sqrt());
    if q == 0.0 {
        return vec![Root { re: 0.0, im: 0.0 }, Root { re: 0.0, im: 0.0 }];
    }
    vec![Root { re: q / a, im: 0.0 }, Root { re: c / q, im: 0.0 }]
}

/// Simultaneous iteration on all roots of the monic form of `coeffs`
/// (ascending, leading coefficient non-zero).
fn durand_kerner(coeffs: &[f64]) -> Vec<Root> {
    let n = coeffs.len() - 1;
    let lead = coeffs[n];
    let monic: Vec<f64> = coeffs.iter().map(|c| c / lead).collect();

    // Cauchy bound on root magnitude.
    let radius = 1.0 + monic[..n].iter().fold(0.0f64, |m, c| m.max(c.abs()));
    let seed = Complex::new(0.4, 0.9);
    let mut z: Vec<Complex> = Vec::with_capacity(n);
    let mut w = Complex::new(1.0, 0.0);
    for _ in 0..n {
        z.push(Complex::new(w.re * radius, w.im * radius));
        w = w.mul(seed);
    }

    let eval = |x: Complex| -> Complex {
        monic
            .iter()
            .rev()
            .fold(Complex::new(0.0, 0.0), |acc, &c| {
                acc.mul(x).add(Complex::new(c, 0.0))
            })
    };

    for _ in 0..MAX_ITERATIONS {
        let mut max_step = 0.0f64;
        for i in 0..n {
            let mut denom = Complex::new(1.0, 0.0);
            for j in 0..n {
                if i != j {
                    denom = denom.mul(z[i].sub(z[j]));
                }
            }
            if denom.norm() == 0.0 {
                continue;
            }
            let step = eval(z[i]).div(denom);
            z[i] = z[i].sub(step);
            max_step = max_step.max(step.norm() / z[i].norm().max(1.0));
        }
        if max_step < CONVERGENCE_TOL {
            break;
        }
    }

    z.into_iter().map(|c| Root { re: c.re, im: c.im }).collect()
}

/// A few Newton steps on the real polynomial; keeps the input if a step
/// would make things worse.
fn polish(p: &Polynomial, x: f64) -> f64 {
    let dp = p.derivative();
    let mut x = x;
    for _ in 0..3 {
        let d = dp.eval(x);
        if d == 0.0 {
            break;
        }
        let next = x - p.eval(x) / d;
        if !next.is_finite() || p.eval(next).abs() > p.eval(x).abs() {
            break;
        }
        x = next;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{a} vs {b} (tol {tol})");
    }

    #[test]
    fn test_linear_root() {
        let p = Polynomial::from_descending(vec![-5.0, 100.0]);
        let r = real_roots(&p);
        assert_eq!(r.len(), 1);
        assert_close(r[0], 20.0, 1e-12);
    }

    #[test]
    fn test_quadratic_roots_descending() {
        // (x - 1)(x - 3)
        let p = Polynomial::from_descending(vec![1.0, -4.0, 3.0]);
        let r = real_roots(&p);
        assert_eq!(r.len(), 2);
        assert_close(r[0], 3.0, 1e-12);
        assert_close(r[1], 1.0, 1e-12);
    }

    #[test]
    fn test_quadratic_complex_pair_has_no_real_roots() {
        // x^2 + 1
        let p = Polynomial::from_descending(vec![1.0, 0.0, 1.0]);
        assert_eq!(roots(&p).len(), 2);
        assert!(real_roots(&p).is_empty());
    }

    #[test]
    fn test_cubic_roots() {
        // (x + 2)(x - 0.5)(x - 4) = x^3 - 2.5x^2 - 7x + 4
        let p = Polynomial::from_descending(vec![1.0, -2.5, -7.0, 4.0]);
        let r = real_roots(&p);
        assert_eq!(r.len(), 3);
        assert_close(r[0], 4.0, 1e-9);
        assert_close(r[1], 0.5, 1e-9);
        assert_close(r[2], -2.0, 1e-9);
    }

    #[test]
    fn test_cubic_with_complex_pair() {
        // (x - 2)(x^2 + 1) = x^3 - 2x^2 + x - 2
        let p = Polynomial::from_descending(vec![1.0, -2.0, 1.0, -2.0]);
        let all = roots(&p);
        assert_eq!(all.len(), 3);
        let r = real_roots(&p);
        assert_eq!(r.len(), 1);
        assert_close(r[0], 2.0, 1e-9);
    }

    #[test]
    fn test_quartic_roots() {
        // (x-1)(x-2)(x-3)(x-4) = x^4 - 10x^3 + 35x^2 - 50x + 24
        let p = Polynomial::from_descending(vec![1.0, -10.0, 35.0, -50.0, 24.0]);
        let r = real_roots(&p);
        assert_eq!(r.len(), 4);
        for (got, want) in r.iter().zip([4.0, 3.0, 2.0, 1.0]) {
            assert_close(*got, want, 1e-8);
        }
    }

    #[test]
    fn test_vanishing_leading_coefficient_is_trimmed() {
        let p = Polynomial::from_ascending(vec![100.0, -5.0, 1e-20]);
        let r = real_roots(&p);
        assert_eq!(r.len(), 1);
        assert_close(r[0], 20.0, 1e-12);
    }

    #[test]
    fn test_constant_has_no_roots() {
        assert!(roots(&Polynomial::from_ascending(vec![3.0])).is_empty());
        assert!(roots(&Polynomial::from_ascending(vec![])).is_empty());
    }
}
