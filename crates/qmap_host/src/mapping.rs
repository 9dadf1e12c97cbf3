//! Batch mapping job.
//!
//! Loads a circuit and its sampled measurement rows, classifies qubit roles
//! once, then maps every shot in parallel and writes the JSON artifact. Shot
//! order in the output is the order of rows in the samples file, regardless
//! of how the work was scheduled.

use crate::config::Config;
use crate::output::{self, Artifact, Measurements};
use anyhow::{Context, Result, bail, ensure};
use qmap_common::isa::GateKind;
use qmap_core::MapError;
use qmap_core::arrange::{ArrangedResult, ShotRecord};
use qmap_core::bitstream::{SectionFormat, encode_with};
use qmap_core::demux::LabeledMeasurement;
use qmap_core::layout::SurfaceCodeLayout;
use qmap_core::mapper::MeasurementMapper;
use qmap_core::roles::{RoleSet, classify_roles};
use qmap_io::loader::{self, SampleFormat};
use qmap_io::parser::{self, Circuit};
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Rounds implied by the circuit: measure-reset readouts per ancilla.
pub fn infer_rounds(circuit: &Circuit, roles: &RoleSet) -> Result<usize> {
    let readouts: usize = circuit
        .instructions()
        .iter()
        .filter(|inst| inst.kind() == GateKind::MeasureReset)
        .map(|inst| inst.qubit_targets().count())
        .sum();
    let ancillas = roles.num_ancillas();

    if ancillas == 0 {
        bail!("circuit has no measure-reset ancillas; set parameters.rounds explicitly");
    }
    ensure!(
        readouts % ancillas == 0,
        "{} measure-reset readouts do not divide evenly over {} ancillas",
        readouts,
        ancillas
    );
    Ok(readouts / ancillas)
}

/// Labels and arranges every shot in parallel.
///
/// Returns the labeled rows in input order together with the arranged result.
pub fn map_shots(
    mapper: &MeasurementMapper,
    shots: &[Vec<bool>],
) -> Result<(Vec<Vec<LabeledMeasurement>>, ArrangedResult), MapError> {
    let pairs: Vec<(Vec<LabeledMeasurement>, ShotRecord)> = shots
        .par_iter()
        .enumerate()
        .map(|(i, bits)| {
            let labeled = mapper.label(bits)?;
            let record = mapper.arrange_labeled(i + 1, &labeled)?;
            Ok((labeled, record))
        })
        .collect::<Result<_, MapError>>()?;

    let (labeled, records): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
    Ok((labeled, ArrangedResult::from_shots(records)))
}

pub fn run_map(
    circuit_path: &Path,
    samples_path: &Path,
    format: SampleFormat,
    config: &Config,
) -> Result<()> {
    let start_job = Instant::now();

    info!("Loading circuit from {}...", circuit_path.display());
    let circuit_text = std::fs::read_to_string(circuit_path)
        .with_context(|| format!("Failed to open circuit file {}", circuit_path.display()))?;
    let circuit = parser::parse_circuit(&circuit_text)?;

    let roles = classify_roles(circuit.instructions());
    let rounds = match config.parameters.rounds {
        Some(r) => r,
        None => {
            let r = infer_rounds(&circuit, &roles)?;
            info!(rounds = r, "inferred rounds from circuit");
            r
        }
    };

    if let Some(distance) = config.parameters.distance {
        SurfaceCodeLayout::new(distance, rounds)?
            .check(&roles)
            .context("circuit does not match the configured surface code")?;
    }

    if config.mapping.console_log {
        info!(
            ancx = ?roles.anc_x(),
            ancz = ?roles.anc_z(),
            data = ?roles.data().collect::<Vec<_>>(),
            "qubit roles"
        );
    }

    let mapper = MeasurementMapper::new(roles, circuit.qubit_coords(), rounds)?;
    let recorded = circuit.num_measurements();
    ensure!(
        recorded == mapper.shot_len(),
        "circuit records {} measurements per shot but roles predict {}",
        recorded,
        mapper.shot_len()
    );

    info!("Loading samples from {}...", samples_path.display());
    let shots = loader::load_samples(samples_path, format, mapper.shot_len())?;
    info!(shots = shots.len(), bits = mapper.shot_len(), "samples loaded");

    let start_map = Instant::now();
    let (mapped, arranged) = map_shots(&mapper, &shots)?;
    info!("Mapped {} shots in {:?}", arranged.len(), start_map.elapsed());

    if config.mapping.console_log {
        for shot in arranged.shots() {
            info!(
                shot = shot.shot,
                ancx_rounds = shot.ancx.len(),
                ancz_rounds = shot.ancz.len(),
                data = shot.data.ord_qubits.len(),
                "arranged shot"
            );
        }
    }

    let bitstream = if config.bitstream.exporting {
        let section_format: SectionFormat = config.bitstream.format.parse()?;
        let bits = encode_with(&arranged, &section_format);
        if config.bitstream.console_log {
            info!("Bitstream with format {}: {}", section_format, bits);
        } else {
            debug!(len = bits.len(), "bitstream encoded");
        }
        Some(bits)
    } else {
        None
    };

    let artifact = Artifact {
        config,
        circuit_text: Some(circuit_text.as_str()),
        measurements: Measurements {
            raw: &shots,
            mapped: &mapped,
            mapped_ordered: &arranged,
            bitstream: bitstream.as_deref(),
        },
    };

    let out = &config.output.file;
    output::write_artifact(out, &artifact, config.output.prettify)?;
    info!("Wrote {}", out.display());

    if config.output.hashed_copy {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        let hashed = output::write_hashed_copy(out, &artifact, &timestamp)?;
        info!("Wrote {}", hashed.display());
    }

    info!("Job finished: {:.2} seconds", start_job.elapsed().as_secs_f64());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CIRCUIT: &str = "\
QUBIT_COORDS(0, 0) 0
QUBIT_COORDS(1, 0) 1
QUBIT_COORDS(2, 0) 2
QUBIT_COORDS(1, 1) 3
QUBIT_COORDS(0, 1) 4
R 0 1 2 3 4
REPEAT 3 {
    H 3
    CX 3 0 3 1
    H 3
    CX 0 4 2 4
    MR 3 4
    TICK
}
M 0 1 2
";

    #[test]
    fn test_infer_rounds() {
        let circuit = parser::parse_circuit(CIRCUIT).unwrap();
        let roles = classify_roles(circuit.instructions());
        assert_eq!(infer_rounds(&circuit, &roles).unwrap(), 3);
        assert_eq!(circuit.num_measurements(), roles.expected_shot_len(3).unwrap());
        assert_eq!(roles.unordered_readouts(), 0);
    }

    #[test]
    fn test_map_shots_keeps_row_order() {
        let circuit = parser::parse_circuit(CIRCUIT).unwrap();
        let roles = classify_roles(circuit.instructions());
        let mapper = MeasurementMapper::new(roles, circuit.qubit_coords(), 3).unwrap();

        let shots: Vec<Vec<bool>> = (0..64)
            .map(|i| (0..mapper.shot_len()).map(|b| (i >> (b % 6)) & 1 == 1).collect())
            .collect();
        let (mapped, arranged) = map_shots(&mapper, &shots).unwrap();

        assert_eq!(mapped.len(), 64);
        assert_eq!(arranged.len(), 64);
        for (i, (row, shot)) in mapped.iter().zip(arranged.shots()).enumerate() {
            assert_eq!(shot.shot, i + 1);
            let values: Vec<bool> = row.iter().map(|m| m.value).collect();
            assert_eq!(values, shots[i]);
            // ancilla 3 gets the basis change
            assert_eq!(shot.ancx[0].ord_qubits[0].qubit, 3);
            assert_eq!(shot.ancz[2].ord_qubits[0].qubit, 4);
        }
    }

    #[test]
    fn test_map_shots_reports_bad_row() {
        let circuit = parser::parse_circuit(CIRCUIT).unwrap();
        let roles = classify_roles(circuit.instructions());
        let mapper = MeasurementMapper::new(roles, circuit.qubit_coords(), 3).unwrap();
        let shots = vec![vec![false; 9], vec![false; 8]];
        assert_eq!(
            map_shots(&mapper, &shots).unwrap_err(),
            MapError::LengthMismatch {
                expected: 9,
                actual: 8
            }
        );
    }

    #[test]
    fn test_run_map_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let circuit_path = dir.path().join("circuit.stim");
        let samples_path = dir.path().join("samples.01");
        std::fs::write(&circuit_path, CIRCUIT).unwrap();
        // MR 3 4 per round, then M 0 1 2
        std::fs::write(&samples_path, "100110010\n000000000\n").unwrap();

        let mut config = Config::default();
        config.bitstream.exporting = true;
        config.output.file = dir.path().join("out").join("result.json");
        run_map(&circuit_path, &samples_path, SampleFormat::Text01, &config).unwrap();

        let arranged = output::load_arranged(&config.output.file).unwrap();
        assert_eq!(arranged.len(), 2);
        let text = std::fs::read_to_string(&config.output.file).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        // zxd: ancz rounds, ancx rounds, data sorted by x (0, 1, 2)
        assert_eq!(json["measurements"]["bitstream"], "010101010000000000");
        assert_eq!(json["measurements"]["mapped"][0][0], serde_json::json!([true, 3, "ancx"]));
        assert_eq!(json["circuit_text"], CIRCUIT);
    }
}
