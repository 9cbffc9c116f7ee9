use serde::Deserialize;
use crate::domain::mask::Edge;
use crate::error::ConfigurationError;

/// Velocity policy for one edge of the domain, fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundaryCondition {
    /// Wall with zero normal velocity, moving along itself at `tangential`
    /// (positive along +x on bottom/top edges, +y on left/right edges).
    NoSlip {
        #[serde(default)]
        tangential: f64,
    },
    /// Zero normal velocity, zero tangential gradient.
    FreeSlip,
    /// Prescribed velocity.
    Inflow { u: f64, v: f64 },
    /// Zero normal gradient of both components, pressure zero on the edge.
    Outflow,
    /// Zero normal velocity gradient with the edge pressure held at `value`.
    Pressure { value: f64 },
}

impl BoundaryCondition {
    pub fn wall() -> Self {
        BoundaryCondition::NoSlip { tangential: 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DomainBoundaries {
    pub left: BoundaryCondition,
    pub right: BoundaryCondition,
    pub bottom: BoundaryCondition,
    pub top: BoundaryCondition,
}

impl Default for DomainBoundaries {
    fn default() -> Self {
        Self {
            left: BoundaryCondition::wall(),
            right: BoundaryCondition::wall(),
            bottom: BoundaryCondition::wall(),
            top: BoundaryCondition::wall(),
        }
    }
}

impl DomainBoundaries {
    /// Closed box whose top wall slides along +x.
    pub fn lid_driven(lid_speed: f64) -> Self {
        Self {
            top: BoundaryCondition::NoSlip { tangential: lid_speed },
            ..Self::default()
        }
    }

    /// Uniform inflow on the left, outflow on the right, walls top and bottom.
    pub fn channel(inflow_speed: f64) -> Self {
        Self {
            left: BoundaryCondition::Inflow { u: inflow_speed, v: 0.0 },
            right: BoundaryCondition::Outflow,
            ..Self::default()
        }
    }

    /// Channel driven by a pressure drop from the left edge to the right one.
    pub fn pressure_driven(inlet: f64, outlet: f64) -> Self {
        Self {
            left: BoundaryCondition::Pressure { value: inlet },
            right: BoundaryCondition::Pressure { value: outlet },
            ..Self::default()
        }
    }

    pub fn get(&self, edge: Edge) -> BoundaryCondition {
        match edge {
            Edge::Left => self.left,
            Edge::Right => self.right,
            Edge::Bottom => self.bottom,
            Edge::Top => self.top,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let edges = [
            (Edge::Left, self.left),
            (Edge::Right, self.right),
            (Edge::Bottom, self.bottom),
            (Edge::Top, self.top),
        ];
        for (edge, bc) in edges {
            let finite = match bc {
                BoundaryCondition::NoSlip { tangential } => tangential.is_finite(),
                BoundaryCondition::Inflow { u, v } => u.is_finite() && v.is_finite(),
                BoundaryCondition::Pressure { value } => value.is_finite(),
                BoundaryCondition::FreeSlip | BoundaryCondition::Outflow => true,
            };
            if !finite {
                return Err(ConfigurationError::InvalidBoundaryCombination(format!(
                    "{:?} edge has a non-finite value: {:?}",
                    edge, bc
                )));
            }
        }

        // With walls everywhere else the pressure Poisson problem has no solution
        let has_inflow = edges.iter().any(|(_, bc)| matches!(bc, BoundaryCondition::Inflow { .. }));
        let has_outflow = edges
            .iter()
            .any(|(_, bc)| matches!(bc, BoundaryCondition::Outflow | BoundaryCondition::Pressure { .. }));
        if has_inflow && !has_outflow {
            return Err(ConfigurationError::InvalidBoundaryCombination(
                "an inflow edge requires at least one outflow or pressure edge".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_closed_box() {
        let bcs = DomainBoundaries::default();
        for edge in [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top] {
            assert_eq!(bcs.get(edge), BoundaryCondition::wall());
        }
        assert!(bcs.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let lid = DomainBoundaries::lid_driven(2.0);
        assert_eq!(lid.top, BoundaryCondition::NoSlip { tangential: 2.0 });
        assert_eq!(lid.bottom, BoundaryCondition::wall());
        assert!(lid.validate().is_ok());

        let channel = DomainBoundaries::channel(1.0);
        assert_eq!(channel.get(Edge::Left), BoundaryCondition::Inflow { u: 1.0, v: 0.0 });
        assert_eq!(channel.get(Edge::Right), BoundaryCondition::Outflow);
        assert!(channel.validate().is_ok());
    }

    #[test]
    fn test_inflow_without_outflow_is_rejected() {
        let bcs = DomainBoundaries {
            left: BoundaryCondition::Inflow { u: 1.0, v: 0.0 },
            ..DomainBoundaries::default()
        };
        assert!(matches!(
            bcs.validate(),
            Err(ConfigurationError::InvalidBoundaryCombination(_))
        ));
    }

    #[test]
    fn test_pressure_edge_pairs_with_inflow() {
        let bcs = DomainBoundaries {
            left: BoundaryCondition::Inflow { u: 1.0, v: 0.0 },
            right: BoundaryCondition::Pressure { value: 0.5 },
            ..DomainBoundaries::default()
        };
        assert!(bcs.validate().is_ok());
        assert!(DomainBoundaries::pressure_driven(1.0, 0.0).validate().is_ok());
    }

    #[test]
    fn test_non_finite_velocity_is_rejected() {
        let bcs = DomainBoundaries::lid_driven(f64::INFINITY);
        assert!(bcs.validate().is_err());
        assert!(DomainBoundaries::pressure_driven(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn test_deserialize_tagged_conditions() {
        let json = r#"{
            "left": { "type": "inflow", "u": 1.5, "v": 0.0 },
            "right": { "type": "outflow" },
            "top": { "type": "free_slip" },
            "bottom": { "type": "pressure", "value": 2.0 }
        }"#;
        let bcs: DomainBoundaries = serde_json::from_str(json).unwrap();
        assert_eq!(bcs.left, BoundaryCondition::Inflow { u: 1.5, v: 0.0 });
        assert_eq!(bcs.right, BoundaryCondition::Outflow);
        assert_eq!(bcs.top, BoundaryCondition::FreeSlip);
        assert_eq!(bcs.bottom, BoundaryCondition::Pressure { value: 2.0 });
    }
}
