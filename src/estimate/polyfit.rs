/// Polynomial with coefficients in ascending order: `coeffs[i]` multiplies `x^i`.
#[derive(Clone, Debug, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
}

impl Polynomial {
    pub fn from_ascending(coeffs: Vec<f64>) -> Self {
        Self { coeffs }
    }

    /// Highest power first.
    pub fn from_descending(mut coeffs: Vec<f64>) -> Self {
        coeffs.reverse();
        Self { coeffs }
    }

    pub fn ascending(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn descending(&self) -> Vec<f64> {
        self.coeffs.iter().rev().copied().collect()
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }

    pub fn derivative(&self) -> Polynomial {
        let coeffs = self
            .coeffs
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, &c)| c * i as f64)
            .collect();
        Polynomial { coeffs }
    }

    /// `p((x - shift) / scale)` expanded back into powers of `x`.
    pub fn compose_affine(&self, shift: f64, scale: f64) -> Polynomial {
        let inner = [-shift / scale, 1.0 / scale];
        let mut acc: Vec<f64> = Vec::new();
        for &c in self.coeffs.iter().rev() {
            let mut next = vec![0.0; acc.len() + 1];
            for (i, &a) in acc.iter().enumerate() {
                next[i] += a * inner[0];
                next[i + 1] += a * inner[1];
            }
            next[0] += c;
            acc = next;
        }
        Polynomial { coeffs: acc }
    }
}

/// Least-squares polynomial fit of `degree` through `(xs, ys)`.
///
/// Solves the Vandermonde system with Householder QR. Returns `None` when
/// the inputs differ in length, there are fewer than `degree + 1` points, or
/// the design matrix is rank deficient (too few distinct `xs`).
pub fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> Option<Polynomial> {
    let n = xs.len();
    let m = degree + 1;
    if ys.len() != n || n < m {
        return None;
    }

    let mut a: Vec<Vec<f64>> = xs
        .iter()
        .map(|&x| {
            let mut row = Vec::with_capacity(m);
            let mut p = 1.0;
            for _ in 0..m {
                row.push(p);
                p *= x;
            }
            row
        })
        .collect();
    let mut b = ys.to_vec();

    for k in 0..m {
        let norm = (k..n).map(|i| a[i][k] * a[i][k]).sum::<f64>().sqrt();
        if norm == 0.0 {
            return None;
        }
        let alpha = if a[k][k] > 0.0 { -norm } else { norm };
        let mut v: Vec<f64> = (k..n).map(|i| a[i][k]).collect();
        v[0] -= alpha;
        let v_norm2: f64 = v.iter().map(|x| x * x).sum();
        if v_norm2 == 0.0 {
            continue;
        }

        for j in k..m {
            let dot: f64 = (k..n).map(|i| v[i - k] * a[i][j]).sum();
            let f = 2.0 * dot / v_norm2;
            for i in k..n {
                a[i][j] -= f * v[i - k];
            }
        }
        let dot: f64 = (k..n).map(|i| v[i - k] * b[i]).sum();
        let f = 2.0 * dot / v_norm2;
        for i in k..n {
            b[i] -= f * v[i - k];
        }
    }

    let max_diag = (0..m).map(|k| a[k][k].abs()).fold(0.0, f64::max);
    if max_diag == 0.0 || (0..m).any(|k| a[k][k].abs() <= max_diag * 1e-12) {
        return None;
    }

    let mut coeffs = vec![0.0; m];
    for k in (0..m).rev() {
        let tail: f64 = ((k + 1)..m).map(|j| a[k][j] * coeffs[j]).sum();
        coeffs[k] = (b[k] - tail) / a[k][k];
    }
    Some(Polynomial { coeffs })
}
