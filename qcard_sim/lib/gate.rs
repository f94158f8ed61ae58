//! The fixed catalog of gates that can appear on cards.
//!
//! Single-qubit gates are the usual Pauli, Hadamard, and phase gates along
//! with their inverses; two-qubit gates are CNOT and SWAP. Rotations about the
//! three Bloch-sphere axes are only available at a small set of discrete
//! angles (see [`Angle`]).
//!
//! See also: <https://en.wikipedia.org/wiki/Quantum_logic_gate>

use std::{ fmt, str::FromStr };
use nalgebra as na;
use num_complex::Complex64 as C64;
use once_cell::sync::Lazy;
use rand::Rng;
use crate::{
    error::{ GameError, GameResult },
    state::EPSILON,
};

/// A square unitary acting on one or two qubits.
pub type GateMatrix = na::DMatrix<C64>;

/// The argument of a rotation gate, limited to the values a card may carry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Angle {
    /// 0
    Pi0,
    /// π
    Pi,
    /// π/2
    Pi1h,
    /// –π/2
    MPi1h,
    /// π/4
    Pi1q,
    /// –π/4
    MPi1q,
    /// 3π/2
    Pi3h,
    /// –3π/2
    MPi3h,
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Pi0   => write!(f, "0"),
            Self::Pi    => write!(f, "π"),
            Self::Pi1h  => write!(f, "π/2"),
            Self::MPi1h => write!(f, "-π/2"),
            Self::Pi1q  => write!(f, "π/4"),
            Self::MPi1q => write!(f, "-π/4"),
            Self::Pi3h  => write!(f, "3π/2"),
            Self::MPi3h => write!(f, "-3π/2"),
        }
    }
}

impl Angle {
    /// Every allowed angle.
    pub const ALL: [Self; 8] = [
        Self::Pi0,
        Self::Pi,
        Self::Pi1h,
        Self::MPi1h,
        Self::Pi1q,
        Self::MPi1q,
        Self::Pi3h,
        Self::MPi3h,
    ];

    /// Convert to radians.
    pub fn radians(self) -> f64 {
        use std::f64::consts::{ FRAC_PI_2 as PI2, FRAC_PI_4 as PI4, PI };
        match self {
            Self::Pi0   => 0.0,
            Self::Pi    => PI,
            Self::Pi1h  => PI2,
            Self::MPi1h => -PI2,
            Self::Pi1q  => PI4,
            Self::MPi1q => -PI4,
            Self::Pi3h  => 3.0 * PI2,
            Self::MPi3h => -3.0 * PI2,
        }
    }

    /// Match a raw angle in radians against the allowed set.
    ///
    /// No reduction modulo 2π is performed: `2π` is not `0` here.
    pub fn from_radians(theta: f64) -> GameResult<Self> {
        Self::ALL.into_iter()
            .find(|a| (a.radians() - theta).abs() < EPSILON)
            .ok_or(GameError::InvalidAngle(Some(theta)))
    }

    /// Sample an allowed angle uniformly.
    pub fn sample<R>(rng: &mut R) -> Self
    where R: Rng + ?Sized
    {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Identity for a gate in the catalog, without any qubit assignment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GateKind {
    /// Identity
    I,
    /// π rotation about X
    X,
    /// π rotation about Y
    Y,
    /// π rotation about Z
    Z,
    /// Hadamard
    H,
    /// π/2 rotation about Z
    S,
    /// S<sup>†</sup>
    SDag,
    /// π/4 rotation about Z
    T,
    /// T<sup>†</sup>
    TDag,
    /// Z-controlled π rotation about X.
    ///
    /// The first qubit index is the control.
    CNOT,
    /// Swap
    Swap,
    /// Rotation about X by an [`Angle`]
    Rx,
    /// Rotation about Y by an [`Angle`]
    Ry,
    /// Rotation about Z by an [`Angle`]
    Rz,
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for GateKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "I" => Ok(Self::I),
            "X" => Ok(Self::X),
            "Y" => Ok(Self::Y),
            "Z" => Ok(Self::Z),
            "H" => Ok(Self::H),
            "S" => Ok(Self::S),
            "SDAGGER" | "S†" | "Sdg" => Ok(Self::SDag),
            "T" => Ok(Self::T),
            "TDAGGER" | "T†" | "Tdg" => Ok(Self::TDag),
            "CNOT" | "CX" => Ok(Self::CNOT),
            "SWAP" => Ok(Self::Swap),
            "Rx" => Ok(Self::Rx),
            "Ry" => Ok(Self::Ry),
            "Rz" => Ok(Self::Rz),
            _ => Err(GameError::UnknownGate(s.to_string())),
        }
    }
}

impl GateKind {
    /// The whole catalog: fixed gates first, then the three rotations.
    pub const ALL: [Self; 14] = [
        Self::I,
        Self::X,
        Self::Y,
        Self::Z,
        Self::H,
        Self::S,
        Self::SDag,
        Self::T,
        Self::TDag,
        Self::CNOT,
        Self::Swap,
        Self::Rx,
        Self::Ry,
        Self::Rz,
    ];

    /// Canonical name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::I    => "I",
            Self::X    => "X",
            Self::Y    => "Y",
            Self::Z    => "Z",
            Self::H    => "H",
            Self::S    => "S",
            Self::SDag => "SDAGGER",
            Self::T    => "T",
            Self::TDag => "TDAGGER",
            Self::CNOT => "CNOT",
            Self::Swap => "SWAP",
            Self::Rx   => "Rx",
            Self::Ry   => "Ry",
            Self::Rz   => "Rz",
        }
    }

    /// Return `true` if `self` takes an angle.
    pub fn is_rotation(self) -> bool {
        matches!(self, Self::Rx | Self::Ry | Self::Rz)
    }

    /// Number of qubits the gate acts on.
    pub fn arity(self) -> usize {
        match self {
            Self::CNOT | Self::Swap => 2,
            _ => 1,
        }
    }

    /// Look up the matrix for `self`.
    ///
    /// Fixed gates must be given no angle and rotations must be given one of
    /// the allowed [`Angle`]s; anything else is
    /// [`InvalidAngle`][GameError::InvalidAngle].
    pub fn matrix(self, angle: Option<f64>) -> GameResult<GateMatrix> {
        match (self.is_rotation(), angle) {
            (true, Some(theta)) => {
                Ok(self.rotation(Angle::from_radians(theta)?))
            },
            (true, None) => Err(GameError::InvalidAngle(None)),
            (false, Some(theta)) => Err(GameError::InvalidAngle(Some(theta))),
            (false, None) => Ok(self.fixed()),
        }
    }

    /// Like [`Self::matrix`], but with an angle already known to be valid.
    ///
    /// The angle is ignored for fixed gates.
    pub fn matrix_at(self, angle: Angle) -> GateMatrix {
        if self.is_rotation() { self.rotation(angle) } else { self.fixed() }
    }

    fn fixed(self) -> GateMatrix {
        let mat: &Lazy<GateMatrix> = match self {
            Self::I    => &GATE_I,
            Self::X    => &GATE_X,
            Self::Y    => &GATE_Y,
            Self::Z    => &GATE_Z,
            Self::H    => &GATE_H,
            Self::S    => &GATE_S,
            Self::SDag => &GATE_SDAG,
            Self::T    => &GATE_T,
            Self::TDag => &GATE_TDAG,
            Self::CNOT => &GATE_CNOT,
            Self::Swap => &GATE_SWAP,
            Self::Rx | Self::Ry | Self::Rz => unreachable!(),
        };
        Lazy::force(mat).clone()
    }

    fn rotation(self, angle: Angle) -> GateMatrix {
        let th2 = angle.radians() / 2.0;
        let c: C64 = th2.cos().into();
        let s: C64 = th2.sin().into();
        let i = C64::i();
        let z = C64::from(0.0);
        match self {
            Self::Rx => GateMatrix::from_row_slice(2, 2, &[
                c,      -i * s,
                -i * s, c,
            ]),
            Self::Ry => GateMatrix::from_row_slice(2, 2, &[
                c, -s,
                s,  c,
            ]),
            Self::Rz => GateMatrix::from_row_slice(2, 2, &[
                C64::cis(-th2), z,
                z,              C64::cis(th2),
            ]),
            _ => unreachable!(),
        }
    }
}

/// Look up a gate matrix by name.
pub fn matrix_for(name: &str, angle: Option<f64>) -> GameResult<GateMatrix> {
    name.parse::<GateKind>()?.matrix(angle)
}

/// Number of qubits a gate matrix acts on, derived from its dimension.
pub fn required_qubit_count(gate: &GateMatrix) -> GameResult<usize> {
    match gate.shape() {
        (2, 2) => Ok(1),
        (4, 4) => Ok(2),
        (r, c) if r != c => Err(GameError::NotUnitary),
        (r, _) => Err(GameError::UnsupportedGateSize(r)),
    }
}

/// Return `true` if `gate` is square and `U†U = I` to within [`EPSILON`].
pub fn is_unitary(gate: &GateMatrix) -> bool {
    if !gate.is_square() { return false; }
    let n = gate.nrows();
    let prod = gate.adjoint() * gate;
    (0..n).all(|i| {
        (0..n).all(|j| {
            let target = if i == j { 1.0 } else { 0.0 };
            (prod[(i, j)] - target).norm() < EPSILON
        })
    })
}

fn mat2(elems: [C64; 4]) -> GateMatrix {
    GateMatrix::from_row_slice(2, 2, &elems)
}

fn real(x: f64) -> C64 { C64::from(x) }

/// Single-qubit identity.
pub static GATE_I: Lazy<GateMatrix> =
    Lazy::new(|| GateMatrix::identity(2, 2));

/// Pauli *X*.
pub static GATE_X: Lazy<GateMatrix> =
    Lazy::new(|| mat2([real(0.0), real(1.0), real(1.0), real(0.0)]));

/// Pauli *Y*.
pub static GATE_Y: Lazy<GateMatrix> =
    Lazy::new(|| mat2([real(0.0), -C64::i(), C64::i(), real(0.0)]));

/// Pauli *Z*.
pub static GATE_Z: Lazy<GateMatrix> =
    Lazy::new(|| mat2([real(1.0), real(0.0), real(0.0), real(-1.0)]));

/// Hadamard.
pub static GATE_H: Lazy<GateMatrix> =
    Lazy::new(|| {
        use std::f64::consts::FRAC_1_SQRT_2 as ORT2;
        mat2([real(ORT2), real(ORT2), real(ORT2), real(-ORT2)])
    });

/// π/2 phase.
pub static GATE_S: Lazy<GateMatrix> =
    Lazy::new(|| mat2([real(1.0), real(0.0), real(0.0), C64::i()]));

/// –π/2 phase.
pub static GATE_SDAG: Lazy<GateMatrix> =
    Lazy::new(|| mat2([real(1.0), real(0.0), real(0.0), -C64::i()]));

/// π/4 phase.
pub static GATE_T: Lazy<GateMatrix> =
    Lazy::new(|| {
        use std::f64::consts::FRAC_PI_4 as PI4;
        mat2([real(1.0), real(0.0), real(0.0), C64::cis(PI4)])
    });

/// –π/4 phase.
pub static GATE_TDAG: Lazy<GateMatrix> =
    Lazy::new(|| {
        use std::f64::consts::FRAC_PI_4 as PI4;
        mat2([real(1.0), real(0.0), real(0.0), C64::cis(-PI4)])
    });

/// CNOT, with the more significant qubit as control.
pub static GATE_CNOT: Lazy<GateMatrix> =
    Lazy::new(|| {
        let mut m = GateMatrix::zeros(4, 4);
        m[(0, 0)] = real(1.0);
        m[(1, 1)] = real(1.0);
        m[(2, 3)] = real(1.0);
        m[(3, 2)] = real(1.0);
        m
    });

/// SWAP.
pub static GATE_SWAP: Lazy<GateMatrix> =
    Lazy::new(|| {
        let mut m = GateMatrix::zeros(4, 4);
        m[(0, 0)] = real(1.0);
        m[(1, 2)] = real(1.0);
        m[(2, 1)] = real(1.0);
        m[(3, 3)] = real(1.0);
        m
    });

#[cfg(test)]
mod test {
    use super::*;

    fn close(a: &GateMatrix, b: &GateMatrix) -> bool {
        a.shape() == b.shape()
            && a.iter().zip(b.iter()).all(|(x, y)| (*x - *y).norm() < EPSILON)
    }

    #[test]
    fn catalog_is_unitary() {
        for kind in GateKind::ALL {
            if kind.is_rotation() {
                for angle in Angle::ALL {
                    let m = kind.matrix(Some(angle.radians())).unwrap();
                    assert!(is_unitary(&m), "{kind}({angle})");
                }
            } else {
                let m = kind.matrix(None).unwrap();
                assert!(is_unitary(&m), "{kind}");
                assert_eq!(required_qubit_count(&m).unwrap(), kind.arity());
            }
        }
    }

    #[test]
    fn names_roundtrip() {
        for kind in GateKind::ALL {
            assert_eq!(kind.name().parse::<GateKind>().unwrap(), kind);
        }
        assert_eq!(
            "U3".parse::<GateKind>(),
            Err(GameError::UnknownGate("U3".to_string())),
        );
        assert!(matches!(
            matrix_for("Toffoli", None),
            Err(GameError::UnknownGate(_)),
        ));
    }

    #[test]
    fn angle_validation() {
        use std::f64::consts::PI;
        assert_eq!(Angle::from_radians(-3.0 * PI / 2.0), Ok(Angle::MPi3h));
        assert_eq!(
            Angle::from_radians(PI / 3.0),
            Err(GameError::InvalidAngle(Some(PI / 3.0))),
        );
        assert!(matches!(
            GateKind::Rx.matrix(Some(0.1)),
            Err(GameError::InvalidAngle(Some(_))),
        ));
        assert!(matches!(GateKind::X.matrix(Some(PI)), Err(GameError::InvalidAngle(Some(_)))));
        // a missing angle is an ordinary, comparable error
        let missing = GateKind::Ry.matrix(None).unwrap_err();
        assert_eq!(missing, GameError::InvalidAngle(None));
        assert_eq!(missing, missing.clone());
        assert_eq!(missing.to_string(), "rotation gates need an angle");
    }

    #[test]
    fn rotations_match_paulis() {
        use std::f64::consts::PI;
        let mi = -C64::i();
        // Rx(π) = -iX, Ry(π) = -iY, Rz(π) = -iZ
        let rx = GateKind::Rx.matrix(Some(PI)).unwrap();
        assert!(close(&rx, &(GATE_X.clone() * mi)));
        let ry = GateKind::Ry.matrix(Some(PI)).unwrap();
        assert!(close(&ry, &(GATE_Y.clone() * mi)));
        let rz = GateKind::Rz.matrix(Some(PI)).unwrap();
        assert!(close(&rz, &(GATE_Z.clone() * mi)));
        let r0 = GateKind::Rz.matrix(Some(0.0)).unwrap();
        assert!(close(&r0, Lazy::force(&GATE_I)));
    }

    #[test]
    fn qubit_count_from_dimension() {
        assert_eq!(required_qubit_count(&GATE_H), Ok(1));
        assert_eq!(required_qubit_count(&GATE_SWAP), Ok(2));
        assert_eq!(
            required_qubit_count(&GateMatrix::identity(8, 8)),
            Err(GameError::UnsupportedGateSize(8)),
        );
        assert_eq!(
            required_qubit_count(&GateMatrix::zeros(2, 4)),
            Err(GameError::NotUnitary),
        );
    }
}
