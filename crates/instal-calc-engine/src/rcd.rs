//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Residual current device grouping."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use crate::{bom::BomLine, tables::RcdConfig};

/// One terminal RCD per run of at most `group_size` consecutive circuits,
/// plus a single upstream device when requested and configured. Nothing is
/// emitted for an empty installation.
pub fn rcd_lines<T>(
    circuits: &[T],
    group_size: usize,
    config: &RcdConfig,
    include_upstream: bool,
) -> Vec<BomLine> {
    if circuits.is_empty() {
        return Vec::new();
    }

    let mut lines: Vec<BomLine> = circuits
        .chunks(group_size.max(1))
        .enumerate()
        .map(|(index, group)| BomLine::terminal_rcd(&config.terminal, index + 1, group.len()))
        .collect();

    if include_upstream {
        if let Some(upstream) = &config.upstream {
            lines.push(BomLine::upstream_rcd(upstream));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bom::aggregate,
        tables::{RcdDevice, RcdKind},
    };

    fn config() -> RcdConfig {
        RcdConfig {
            upstream: Some(RcdDevice {
                sensitivity_ma: 300,
                kind: RcdKind::A,
                selective: true,
                note: None,
            }),
            ..RcdConfig::default()
        }
    }

    #[test]
    fn nine_circuits_in_groups_of_four() {
        let circuits = vec![(); 9];
        let lines = rcd_lines(&circuits, 4, &config(), true);
        assert_eq!(lines.len(), 4);

        let terminal: Vec<_> = lines.iter().filter(|l| l.code == "RCD-30mA-A").collect();
        assert_eq!(terminal.len(), 3);
        assert!(terminal[0].description.contains("4 circuits"));
        assert!(terminal[1].description.contains("4 circuits"));
        assert!(terminal[2].description.contains("1 circuits"));
        assert_eq!(lines[3].code, "RCD-300mA-A-S");

        let merged = aggregate(&lines);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].code, "RCD-300mA-A-S");
        assert_eq!(merged[1].code, "RCD-30mA-A");
        assert_eq!(merged[1].quantity, 3.0);
    }

    #[test]
    fn upstream_only_when_requested_and_configured() {
        let circuits = vec![(); 2];
        assert_eq!(rcd_lines(&circuits, 4, &config(), false).len(), 1);
        assert_eq!(rcd_lines(&circuits, 4, &RcdConfig::default(), true).len(), 1);
    }

    #[test]
    fn no_circuits_no_devices() {
        let circuits: Vec<()> = Vec::new();
        assert!(rcd_lines(&circuits, 4, &config(), true).is_empty());
    }

    #[test]
    fn zero_group_size_means_one_per_circuit() {
        let circuits = vec![(); 3];
        assert_eq!(rcd_lines(&circuits, 0, &config(), false).len(), 3);
    }
}
