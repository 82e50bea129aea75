//! Effective hop rates.
//!
//! The graph stores base rates. A [`RateModel`] turns a base rate into the
//! rate an event is enabled with, given who is hopping and which way. The
//! scheduler treats the model as opaque.

use crate::CarrierKind;
use kmc_types::{Hop, Vec3};
use std::fmt;

/// Maps a (carrier species, hop) pair to an effective rate.
///
/// Implementations must be pure: the same inputs always give the same
/// rate, or incremental refresh would diverge from a full rebuild.
pub trait RateModel: fmt::Debug + Send + Sync {
    /// Effective rate for `kind` taking `hop`. Must be finite and `>= 0`.
    fn rate(&self, kind: CarrierKind, hop: &Hop) -> f64;
}

/// Uses the graph's base rates unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbiased;

impl RateModel for Unbiased {
    fn rate(&self, _kind: CarrierKind, hop: &Hop) -> f64 {
        hop.rate
    }
}

/// Exponential bias from a uniform applied field.
///
/// `rate = base * exp(q (E · Δr) / kT)`, with `q` the carrier charge in
/// elementary units, `E` the field, `Δr` the hop's minimum-image
/// displacement, and `kT` the thermal energy in matching units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBias {
    pub field: Vec3,
    pub thermal_energy: f64,
}

impl FieldBias {
    pub fn new(field: Vec3, thermal_energy: f64) -> Self {
        Self {
            field,
            thermal_energy,
        }
    }

    /// Multiplicative factor applied to a base rate.
    pub fn factor(&self, kind: CarrierKind, displacement: Vec3) -> f64 {
        if self.field == Vec3::ZERO {
            return 1.0;
        }
        (kind.charge() * self.field.dot(displacement) / self.thermal_energy).exp()
    }
}

impl RateModel for FieldBias {
    fn rate(&self, kind: CarrierKind, hop: &Hop) -> f64 {
        hop.rate * self.factor(kind, hop.displacement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmc_types::{EdgeIndex, NodeIndex};

    fn hop(displacement: Vec3, rate: f64) -> Hop {
        Hop {
            edge: EdgeIndex(0),
            to: NodeIndex(1),
            displacement,
            rate,
        }
    }

    #[test]
    fn test_unbiased_passes_base_rate() {
        let h = hop(Vec3::new(1.0, 0.0, 0.0), 3.5);
        assert_eq!(Unbiased.rate(CarrierKind::Electron, &h), 3.5);
        assert_eq!(Unbiased.rate(CarrierKind::Hole, &h), 3.5);
    }

    #[test]
    fn test_zero_field_is_identity() {
        let bias = FieldBias::new(Vec3::ZERO, 0.025);
        let h = hop(Vec3::new(1.0, 2.0, 3.0), 2.0);
        assert_eq!(bias.rate(CarrierKind::Electron, &h), 2.0);
    }

    #[test]
    fn test_field_favours_charge_direction() {
        let bias = FieldBias::new(Vec3::new(1.0, 0.0, 0.0), 1.0);
        let along = hop(Vec3::new(1.0, 0.0, 0.0), 1.0);
        let against = hop(Vec3::new(-1.0, 0.0, 0.0), 1.0);

        // Holes drift with the field, electrons against it.
        assert!((bias.rate(CarrierKind::Hole, &along) - std::f64::consts::E).abs() < 1e-12);
        assert!((bias.rate(CarrierKind::Hole, &against) - (-1.0f64).exp()).abs() < 1e-12);
        assert!(
            bias.rate(CarrierKind::Electron, &against) > bias.rate(CarrierKind::Electron, &along)
        );
    }

    #[test]
    fn test_perpendicular_hop_unbiased() {
        let bias = FieldBias::new(Vec3::new(0.0, 0.0, 5.0), 0.5);
        let h = hop(Vec3::new(1.0, 1.0, 0.0), 4.0);
        assert_eq!(bias.rate(CarrierKind::Electron, &h), 4.0);
    }
}
