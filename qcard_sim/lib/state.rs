//! Dense *n*-qubit statevectors and the linear algebra acting on them.
//!
//! A state of *n* qubits is a normalized vector of 2<sup>*n*</sup> complex
//! amplitudes in the computational basis. Basis index *i* is the state whose
//! *n*-bit binary expansion is *i*, with qubit 0 as the **most** significant
//! bit; qubit *q* is therefore bit *n* – 1 – *q* of the index. Every operation
//! here (gate embedding, measurement, ancilla insertion) uses this convention.
//!
//! # Example
//! ```
//! use qcard_sim::{ gate::GateKind, state::StateVector };
//!
//! // ∣00⟩
//! let state = StateVector::zero(2);
//!
//! // H on qubit 0, then CNOT 0 → 1 gives a Bell state
//! let state = state
//!     .apply_gate(&GateKind::H.matrix(None).unwrap(), &[0]).unwrap()
//!     .apply_gate(&GateKind::CNOT.matrix(None).unwrap(), &[0, 1]).unwrap();
//! println!("{}", state);
//! // +0.7071∣00⟩ +0.7071∣11⟩
//! ```

use std::fmt;
use itertools::Itertools;
use nalgebra as na;
use num_complex::Complex64 as C64;
use once_cell::sync::Lazy;
use rand::Rng;
use crate::{
    error::{ GameError, GameResult },
    gate::{ GATE_I, GateMatrix, required_qubit_count },
};

/// Tolerance used for every floating-point comparison in the crate.
pub const EPSILON: f64 = 1e-9;

const ZERO: C64 = C64 { re: 0.0, im: 0.0 };

/// A normalized pure state of a finite register of qubits.
#[derive(Clone, Debug, PartialEq)]
pub struct StateVector(na::DVector<C64>);

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.num_qubits();
        let kets
            = self.0.iter()
            .enumerate()
            .filter(|(_, a)| a.norm() > EPSILON)
            .map(|(k, a)| {
                let amp
                    = if a.im.abs() < EPSILON {
                        format!("{:+.4}", a.re)
                    } else if a.re.abs() < EPSILON {
                        format!("{:+.4}i", a.im)
                    } else {
                        format!("+({:.4}{:+.4}i)", a.re, a.im)
                    };
                format!("{}∣{:0w$b}⟩", amp, k, w = n)
            })
            .join(" ");
        write!(f, "{}", kets)
    }
}

impl AsRef<[C64]> for StateVector {
    fn as_ref(&self) -> &[C64] { self.0.as_slice() }
}

impl StateVector {
    /// Validate a list of amplitudes as a statevector.
    ///
    /// Fails with [`InvalidStatevector`][GameError::InvalidStatevector] if the
    /// length is not a power of two or the squared magnitudes do not sum to 1.
    pub fn new<I>(amps: I) -> GameResult<Self>
    where I: IntoIterator<Item = C64>
    {
        let amps: Vec<C64> = amps.into_iter().collect();
        if is_valid_statevector(&amps) {
            Ok(Self(na::DVector::from_vec(amps)))
        } else {
            Err(GameError::InvalidStatevector)
        }
    }

    /// Like [`Self::new`], but rescale the amplitudes to unit norm first.
    ///
    /// Fails if the length is not a power of two or all amplitudes are zero.
    pub fn normalized<I>(amps: I) -> GameResult<Self>
    where I: IntoIterator<Item = C64>
    {
        let amps: Vec<C64> = amps.into_iter().collect();
        let norm: f64 = amps.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
        if amps.is_empty() || !amps.len().is_power_of_two() || norm < EPSILON {
            return Err(GameError::InvalidStatevector);
        }
        Ok(Self(na::DVector::from_iterator(
            amps.len(), amps.into_iter().map(|a| a / norm))))
    }

    /// The computational basis state ∣`k`⟩ on `n` qubits.
    ///
    /// *Panics if `k` ≥ 2<sup>`n`</sup>.*
    pub fn basis(n: usize, k: usize) -> Self {
        let mut amps = na::DVector::from_element(1 << n, ZERO);
        amps[k] = C64::from(1.0);
        Self(amps)
    }

    /// ∣0...0⟩ on `n` qubits.
    pub fn zero(n: usize) -> Self { Self::basis(n, 0) }

    /// A state on `n` qubits drawn uniformly from the unit sphere.
    ///
    /// Every amplitude is an independent standard complex normal (sampled by
    /// Box-Muller) and the result is normalized.
    pub fn random<R>(n: usize, rng: &mut R) -> Self
    where R: Rng + ?Sized
    {
        use std::f64::consts::TAU;
        let dim = 1_usize << n;
        loop {
            let amps: na::DVector<C64>
                = na::DVector::from_fn(dim, |_, _| {
                    let r = (-2.0 * (1.0 - rng.gen::<f64>()).ln()).sqrt();
                    C64::from_polar(r, TAU * rng.gen::<f64>())
                });
            let norm = amps.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
            if norm > EPSILON {
                return Self(amps.map(|a| a / norm));
            }
        }
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize { self.0.len().trailing_zeros() as usize }

    /// Number of amplitudes.
    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Borrow the amplitudes.
    pub fn amplitudes(&self) -> &[C64] { self.0.as_slice() }

    /// Borrow the underlying column vector.
    pub fn as_vector(&self) -> &na::DVector<C64> { &self.0 }

    /// Multiply by a full-system matrix.
    ///
    /// Fails with [`DimensionMismatch`][GameError::DimensionMismatch] if the
    /// number of columns in `matrix` differs from the number of amplitudes.
    pub fn apply(&self, matrix: &GateMatrix) -> GameResult<Self> {
        if matrix.ncols() != self.0.len() {
            return Err(GameError::DimensionMismatch {
                cols: matrix.ncols(),
                len: self.0.len(),
            });
        }
        Ok(Self(matrix * &self.0))
    }

    /// Embed a one- or two-qubit gate on `targets` (see [`embed_unitary`])
    /// and apply it.
    pub fn apply_gate(&self, gate: &GateMatrix, targets: &[usize])
        -> GameResult<Self>
    {
        let full = embed_unitary(gate, self.num_qubits(), targets)?;
        self.apply(&full)
    }

    /// Fidelity with another state; see [`fidelity`].
    pub fn fidelity(&self, other: &Self) -> f64 {
        fidelity(self.amplitudes(), other.amplitudes())
    }

    /// Return `true` if every amplitude agrees with `other`'s to within
    /// [`EPSILON`], with no allowance for global phase.
    pub fn is_close(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(other.0.iter())
                .all(|(a, b)| (*a - *b).norm() < EPSILON)
    }

    /// Return `true` if `self` and `other` are equal up to global phase.
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && (1.0 - self.fidelity(other)).abs() < EPSILON
    }

    /// Append a new qubit initialized to ∣0⟩.
    ///
    /// The amplitude list doubles in length, with the new upper half set to
    /// zero. Under the index convention of this module this makes the ancilla
    /// the new qubit 0 (most significant bit); every existing qubit *q*
    /// becomes qubit *q* + 1.
    pub fn with_ancilla(&self) -> Self {
        let len = self.0.len();
        Self(na::DVector::from_iterator(
            2 * len,
            self.0.iter().copied().chain(std::iter::repeat(ZERO).take(len)),
        ))
    }

    /// Probability of finding the `qubit`-th qubit in ∣1⟩.
    pub fn prob_one(&self, qubit: usize) -> GameResult<f64> {
        let n = self.num_qubits();
        if qubit >= n {
            return Err(GameError::QubitIndexOutOfRange {
                index: qubit,
                num_qubits: n,
            });
        }
        let shift = n - 1 - qubit;
        Ok(
            self.0.iter()
                .enumerate()
                .filter(|(i, _)| (i >> shift) & 1 == 1)
                .map(|(_, a)| a.norm_sqr())
                .sum()
        )
    }

    /// Perform a projective *Z*-basis measurement on the `qubit`-th qubit and
    /// remove it from the register.
    ///
    /// The outcome is drawn with the Born-rule probabilities; the returned
    /// state keeps only the amplitudes consistent with the outcome, drops the
    /// measured bit from every index, and is renormalized. Fails with
    /// [`CannotShrinkBelowOneQubit`][GameError::CannotShrinkBelowOneQubit] on a
    /// single-qubit state.
    pub fn measure_and_remove<R>(&self, qubit: usize, rng: &mut R)
        -> GameResult<(u8, Self)>
    where R: Rng + ?Sized
    {
        let n = self.num_qubits();
        if n <= 1 { return Err(GameError::CannotShrinkBelowOneQubit); }
        let p1 = self.prob_one(qubit)?;
        let p0: f64 = self.0.iter().map(|a| a.norm_sqr()).sum::<f64>() - p1;
        let outcome: u8 = if rng.gen::<f64>() * (p0 + p1) < p0 { 0 } else { 1 };
        Ok((outcome, self.collapse(qubit, outcome, if outcome == 0 { p0 } else { p1 })))
    }

    // keep amplitudes whose `qubit` bit equals `outcome`, divide by √p
    fn collapse(&self, qubit: usize, outcome: u8, p: f64) -> Self {
        let shift = self.num_qubits() - 1 - qubit;
        let norm = p.sqrt();
        let kept: Vec<C64>
            = self.0.iter()
            .enumerate()
            .filter(|(i, _)| (i >> shift) & 1 == outcome as usize)
            .map(|(_, a)| *a / norm)
            .collect();
        Self(na::DVector::from_vec(kept))
    }

    /// Unwrap into the underlying column vector.
    pub fn into_inner(self) -> na::DVector<C64> { self.0 }
}

/// Return `true` if `amps` has a power-of-two length and unit norm.
pub fn is_valid_statevector(amps: &[C64]) -> bool {
    if amps.is_empty() || !amps.len().is_power_of_two() { return false; }
    let norm: f64 = amps.iter().map(|a| a.norm_sqr()).sum();
    (norm - 1.0).abs() < EPSILON
}

/// Normalized overlap |⟨a∣b⟩| / (‖a‖ ‖b‖), in [0, 1].
///
/// Symmetric in its arguments and insensitive to global phase. If the two
/// vectors differ in length, the shorter is padded with zeros, which compares
/// it as though the missing (leading) qubits were ancillas in ∣0⟩. Returns 0 if
/// either vector has zero norm.
pub fn fidelity(a: &[C64], b: &[C64]) -> f64 {
    let inner: C64 = a.iter().zip(b).map(|(ak, bk)| *ak * bk.conj()).sum();
    let na: f64 = a.iter().map(|ak| ak.norm_sqr()).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|bk| bk.norm_sqr()).sum::<f64>().sqrt();
    if na < EPSILON || nb < EPSILON { return 0.0; }
    (inner.norm() / (na * nb)).min(1.0)
}

/// Build the 2<sup>`total_qubits`</sup>-dimensional operator acting as `gate`
/// on `targets` and as the identity everywhere else.
///
/// For a single-qubit gate this is the Kronecker product over all qubits in
/// index order with `gate` at `targets[0]`. For a two-qubit gate, `targets[0]`
/// maps to the more significant bit of the gate's own index (so it is the
/// control of a CNOT), and the matrix element between two basis states is
/// zero unless all their non-target bits agree.
///
/// Fails with [`GateArityMismatch`][GameError::GateArityMismatch] if the
/// number of targets is wrong or the two targets coincide, and with
/// [`QubitIndexOutOfRange`][GameError::QubitIndexOutOfRange] if a target is
/// not a valid qubit.
pub fn embed_unitary(gate: &GateMatrix, total_qubits: usize, targets: &[usize])
    -> GameResult<GateMatrix>
{
    let arity = required_qubit_count(gate)?;
    if targets.len() != arity {
        return Err(GameError::GateArityMismatch {
            expected: arity,
            got: targets.len(),
        });
    }
    if let Some(&index) = targets.iter().find(|q| **q >= total_qubits) {
        return Err(GameError::QubitIndexOutOfRange {
            index,
            num_qubits: total_qubits,
        });
    }
    match *targets {
        [q] => Ok(embed_single(gate, total_qubits, q)),
        [a, b] if a == b
            => Err(GameError::GateArityMismatch { expected: 2, got: 1 }),
        [a, b] => Ok(embed_double(gate, total_qubits, a, b)),
        _ => unreachable!(),
    }
}

fn embed_single(gate: &GateMatrix, n: usize, q: usize) -> GateMatrix {
    (0..n).fold(GateMatrix::identity(1, 1), |acc, k| {
        if k == q {
            acc.kronecker(gate)
        } else {
            acc.kronecker(Lazy::force(&GATE_I))
        }
    })
}

fn embed_double(gate: &GateMatrix, n: usize, a: usize, b: usize)
    -> GateMatrix
{
    let dim: usize = 1 << n;
    let sa: usize = n - 1 - a;
    let sb: usize = n - 1 - b;
    let rest: usize = !((1 << sa) | (1 << sb));
    let sub = |i: usize| (((i >> sa) & 1) << 1) | ((i >> sb) & 1);
    GateMatrix::from_fn(dim, dim, |i, j| {
        if i & rest == j & rest { gate[(sub(i), sub(j))] } else { ZERO }
    })
}
