//! Cross-modal coupling between paired maps.
//!
//! Every neuron of a map holds one link weight toward each site of its
//! partner's lattice. The links drive the cross-modal BMU search and are
//! learned with a Hebbian or covariance rule on the joint activations of
//! both maps, followed by a min-max normalization of each map's links.
//!
//! Both the drive computation and the link update are O(R²C²) per pairing
//! and dominate the cost of a training step.

use crate::error::{CorrsomError, Result};
use crate::schedule::CrossModalRule;
use crate::som::{Coord, Som};
use rayon::prelude::*;

fn check_pairing(source: &Som, dest: &Som) -> Result<()> {
    source.validate()?;
    dest.validate()?;
    if source.partner_shape != dest.shape {
        return Err(CorrsomError::mismatch(
            format!("links of SOM{} toward SOM{}", source.id, dest.id),
            dest.shape,
            source.partner_shape,
        ));
    }
    if dest.partner_shape != source.shape {
        return Err(CorrsomError::mismatch(
            format!("links of SOM{} toward SOM{}", dest.id, source.id),
            source.shape,
            dest.partner_shape,
        ));
    }
    Ok(())
}

/// Cross-modal drive of every destination neuron, row-major:
/// `drive(i,j) = sum_(p,q) As_src(p,q) * H_src(p,q)[i][j]`.
pub fn cross_modal_drive(source: &Som, dest: &Som) -> Result<Vec<f64>> {
    check_pairing(source, dest)?;

    let drive = (0..dest.total_neurons())
        .into_par_iter()
        .map(|target| {
            source
                .neurons
                .iter()
                .map(|n| n.activation.sensory * n.links.as_slice()[target])
                .sum::<f64>()
        })
        .collect();

    Ok(drive)
}

/// Finds the destination neuron most strongly driven through the links of
/// `source`, whose sensory activation must be current.
///
/// The scan is row-major with a strict `>` against an initial threshold of
/// zero, so a field with no positive drive selects (0, 0).
pub fn find_cross_modal_bmu(source: &Som, dest: &Som) -> Result<Coord> {
    let drive = cross_modal_drive(source, dest)?;

    let mut best_idx = 0;
    let mut best_drive = 0.0;
    for (i, &d) in drive.iter().enumerate() {
        if d > best_drive {
            best_drive = d;
            best_idx = i;
        }
    }

    Ok(dest.shape.coord(best_idx))
}

/// Raw increment of one link under `rule`.
///
/// `a` and `b` are the joint activations at both ends of the link; the means
/// are only used by the covariance rule. [`CrossModalRule::None`] has no
/// increment: [`accumulate_links`] forces those links to zero instead.
#[inline]
pub fn link_update(rule: CrossModalRule, kappa: f64, a: f64, mean_a: f64, b: f64, mean_b: f64) -> f64 {
    match rule {
        CrossModalRule::None => 0.0,
        CrossModalRule::Hebbian => kappa * a * b,
        CrossModalRule::Covariance => kappa * (a - mean_a) * (b - mean_b),
    }
}

/// Updates the links between `s` and `d` in both directions.
///
/// For every (i,j) in `s` and (h,k) in `d`, `s.H(i,j)[h][k]` and its mirror
/// `d.H(h,k)[i][j]` receive the same increment. Joint activations of both
/// maps must be final for the step. Links are left unnormalized.
pub fn accumulate_links(s: &mut Som, d: &mut Som, rule: CrossModalRule, kappa: f64) -> Result<()> {
    check_pairing(s, d)?;

    let s_joint = s.joint_activations();
    let d_joint = d.joint_activations();
    let s_mean = s.mean_joint_activation();
    let d_mean = d.mean_joint_activation();

    let delta = |a: f64, b: f64| link_update(rule, kappa, a, s_mean, b, d_mean);

    s.neurons
        .par_iter_mut()
        .zip(s_joint.par_iter())
        .for_each(|(neuron, &a)| {
            for (h, &b) in neuron.links.as_mut_slice().iter_mut().zip(d_joint.iter()) {
                *h = match rule {
                    CrossModalRule::None => 0.0,
                    _ => *h + delta(a, b),
                };
            }
        });

    d.neurons
        .par_iter_mut()
        .zip(d_joint.par_iter())
        .for_each(|(neuron, &b)| {
            for (h, &a) in neuron.links.as_mut_slice().iter_mut().zip(s_joint.iter()) {
                *h = match rule {
                    CrossModalRule::None => 0.0,
                    _ => *h + delta(a, b),
                };
            }
        });

    Ok(())
}

/// Min-max normalizes the whole link tensor of `som` into `[0, 1]`.
///
/// When every link has the same value the tensor is cleared to zero and
/// `false` is returned.
pub fn normalize_links(som: &mut Som) -> bool {
    let (min, max) = som.link_bounds();
    let range = max - min;

    if range.is_nan() || range <= 0.0 {
        for neuron in &mut som.neurons {
            neuron.links.as_mut_slice().fill(0.0);
        }
        return false;
    }

    som.neurons.par_iter_mut().for_each(|neuron| {
        for h in neuron.links.as_mut_slice() {
            *h = (*h - min) / range;
        }
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::som::LatticeShape;

    fn pair(s_shape: LatticeShape, d_shape: LatticeShape) -> (Som, Som) {
        (
            Som::new_zeros(1, s_shape, 1, d_shape),
            Som::new_zeros(2, d_shape, 1, s_shape),
        )
    }

    fn set_joint(som: &mut Som, values: &[f64]) {
        for (n, &v) in som.neurons.iter_mut().zip(values) {
            n.activation.joint = v;
        }
    }

    #[test]
    fn test_hebbian_scenario() {
        let delta = link_update(CrossModalRule::Hebbian, 0.5, 0.4, 0.0, 0.6, 0.0);
        assert!((delta - 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_none_rule_zeroes_links() {
        let (mut s, mut d) = pair(LatticeShape::new(2, 2), LatticeShape::new(1, 3));
        for n in s.neurons.iter_mut().chain(d.neurons.iter_mut()) {
            n.links.as_mut_slice().fill(0.7);
            n.activation.joint = 1.0;
        }
        accumulate_links(&mut s, &mut d, CrossModalRule::None, 0.5).unwrap();
        assert_eq!(s.link_bounds(), (0.0, 0.0));
        assert_eq!(d.link_bounds(), (0.0, 0.0));
    }

    #[test]
    fn test_mirrored_update() {
        let (mut s, mut d) = pair(LatticeShape::new(2, 2), LatticeShape::new(1, 3));
        set_joint(&mut s, &[0.4, 0.1, 0.2, 0.3]);
        set_joint(&mut d, &[0.6, 0.5, 0.0]);

        accumulate_links(&mut s, &mut d, CrossModalRule::Hebbian, 0.5).unwrap();

        let s_link = s.get_at(0, 0).unwrap().links.get(Coord::new(0, 0));
        let d_link = d.get_at(0, 0).unwrap().links.get(Coord::new(0, 0));
        assert!((s_link - 0.12).abs() < 1e-12);
        assert_eq!(s_link, d_link);

        // s(1,1) -> d(0,1) and d(0,1) -> s(1,1)
        let s_link = s.get_at(1, 1).unwrap().links.get(Coord::new(0, 1));
        let d_link = d.get_at(0, 1).unwrap().links.get(Coord::new(1, 1));
        assert!((s_link - 0.5 * 0.3 * 0.5).abs() < 1e-12);
        assert_eq!(s_link, d_link);
    }

    #[test]
    fn test_hebbian_accumulates() {
        let (mut s, mut d) = pair(LatticeShape::new(1, 1), LatticeShape::new(1, 1));
        s.neurons[0].links.as_mut_slice()[0] = 1.0;
        set_joint(&mut s, &[0.4]);
        set_joint(&mut d, &[0.6]);
        accumulate_links(&mut s, &mut d, CrossModalRule::Hebbian, 0.5).unwrap();
        assert!((s.neurons[0].links.as_slice()[0] - 1.12).abs() < 1e-12);
    }

    #[test]
    fn test_covariance_cancels_shift() {
        let a = [0.9, 0.2, 0.4, 0.1];
        let b = [0.3, 0.8, 0.5];

        let mean_update = |shift: f64| {
            let (mut s, mut d) = pair(LatticeShape::new(2, 2), LatticeShape::new(1, 3));
            let shifted: Vec<f64> = a.iter().map(|v| v + shift).collect();
            set_joint(&mut s, &shifted);
            set_joint(&mut d, &b);
            accumulate_links(&mut s, &mut d, CrossModalRule::Covariance, 0.35).unwrap();
            let links: Vec<f64> = s
                .neurons
                .iter()
                .flat_map(|n| n.links.as_slice().to_vec())
                .collect();
            links.iter().sum::<f64>() / links.len() as f64
        };

        let base = mean_update(0.0);
        assert!((base - mean_update(0.25)).abs() < 1e-12);
        assert!((base - mean_update(-3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_cross_modal_bmu() {
        let (mut s, d) = pair(LatticeShape::new(2, 2), LatticeShape::new(2, 3));
        s.neurons[0].activation.sensory = 1.0;
        s.neurons[0].links.set(Coord::new(1, 2), 0.5);
        s.neurons[0].links.set(Coord::new(0, 1), 0.25);
        s.neurons[3].activation.sensory = 0.5;
        s.neurons[3].links.set(Coord::new(0, 1), 0.5);

        let drive = cross_modal_drive(&s, &d).unwrap();
        assert_eq!(drive[1], 0.5);
        assert_eq!(drive[5], 0.5);
        assert_eq!(drive[0], 0.0);

        // equal drives: first in row-major order wins
        assert_eq!(find_cross_modal_bmu(&s, &d).unwrap(), Coord::new(0, 1));
    }

    #[test]
    fn test_cross_modal_bmu_zero_field() {
        let (mut s, d) = pair(LatticeShape::new(3, 3), LatticeShape::new(2, 2));
        for n in &mut s.neurons {
            n.links.as_mut_slice().fill(0.8);
        }
        assert_eq!(find_cross_modal_bmu(&s, &d).unwrap(), Coord::new(0, 0));
    }

    #[test]
    fn test_shape_mismatch() {
        let s = Som::new_zeros(1, LatticeShape::new(2, 2), 1, LatticeShape::new(3, 3));
        let mut d = Som::new_zeros(2, LatticeShape::new(2, 3), 1, LatticeShape::new(2, 2));
        assert!(matches!(
            find_cross_modal_bmu(&s, &d),
            Err(CorrsomError::DimensionMismatch { .. })
        ));
        let mut s = s;
        assert!(accumulate_links(&mut s, &mut d, CrossModalRule::Hebbian, 0.1).is_err());
    }

    #[test]
    fn test_short_link_matrix_is_rejected() {
        let (mut s, mut d) = pair(LatticeShape::new(2, 2), LatticeShape::new(2, 3));
        s.neurons[1].links = crate::som::LinkMatrix::zeros(LatticeShape::new(1, 2));
        assert!(matches!(
            cross_modal_drive(&s, &d),
            Err(CorrsomError::DimensionMismatch { .. })
        ));
        assert!(accumulate_links(&mut s, &mut d, CrossModalRule::Hebbian, 0.1).is_err());
    }

    #[test]
    fn test_normalize_range() {
        let (mut s, _) = pair(LatticeShape::new(2, 2), LatticeShape::new(2, 2));
        for (i, n) in s.neurons.iter_mut().enumerate() {
            for (j, h) in n.links.as_mut_slice().iter_mut().enumerate() {
                *h = (i * 4 + j) as f64 * 0.3 - 1.0;
            }
        }
        assert!(normalize_links(&mut s));

        let (lo, hi) = s.link_bounds();
        assert_eq!(lo, 0.0);
        assert_eq!(hi, 1.0);
        assert!(s
            .neurons
            .iter()
            .flat_map(|n| n.links.as_slice().iter())
            .all(|&h| (0.0..=1.0).contains(&h)));
    }

    #[test]
    fn test_normalize_degenerate() {
        let (mut s, _) = pair(LatticeShape::new(2, 2), LatticeShape::new(2, 2));
        for n in &mut s.neurons {
            n.links.as_mut_slice().fill(0.42);
        }
        assert!(!normalize_links(&mut s));
        assert_eq!(s.link_bounds(), (0.0, 0.0));
    }
}
